use std::sync::Arc;

use common::fixtures;
use scene_viewer::{
    bootstrap::FALLBACK_BACKGROUND,
    context::RendererSettings,
    data_structures::{model::Color, scene_graph::Background},
    pipelines::composite::CompositeUniform,
    render,
};

mod common;

fn to_srgb8(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn texel(color: Color, alpha: f32) -> [f32; 4] {
    [color.r, color.g, color.b, alpha]
}

#[test]
fn should_clear_flat_background_as_untouched() {
    let sky = Color::from_hex(FALLBACK_BACKGROUND);
    let clear = render::clear_color(&Background::Color(sky));
    assert_eq!(clear.a, 0.0);
    assert_eq!(clear.r, sky.r as f64);

    let env = Arc::new(fixtures::uniform_environment(fixtures::small_prefilter()));
    assert_eq!(render::clear_color(&Background::Environment(env)).a, 1.0);
}

#[test]
fn should_show_flat_background_in_its_exact_colour() {
    // shader-side encoding, as on surfaces without an sRGB format
    let composite =
        CompositeUniform::new(&RendererSettings::default(), wgpu::TextureFormat::Bgra8Unorm);
    assert_eq!(composite.encode_srgb, 1);

    let sky = Color::from_hex(FALLBACK_BACKGROUND);
    assert_eq!(to_srgb8(composite.resolve(texel(sky, 0.0))), [0x88, 0xbb, 0xee]);
}

#[test]
fn should_tone_map_drawn_texels() {
    let composite =
        CompositeUniform::new(&RendererSettings::default(), wgpu::TextureFormat::Bgra8Unorm);
    let sky = Color::from_hex(FALLBACK_BACKGROUND);

    let drawn = to_srgb8(composite.resolve(texel(sky, 1.0)));
    assert_ne!(drawn, [0x88, 0xbb, 0xee]);

    // ACES keeps black black and stays within the displayable range
    assert_eq!(to_srgb8(composite.resolve([0.0, 0.0, 0.0, 1.0])), [0, 0, 0]);
    let bright = composite.resolve([50.0, 50.0, 50.0, 1.0]);
    assert!(bright.iter().all(|c| *c <= 1.0 && *c > 0.9), "{:?}", bright);
}

#[test]
fn should_leave_encoding_to_srgb_surfaces() {
    let composite = CompositeUniform::new(
        &RendererSettings::default(),
        wgpu::TextureFormat::Bgra8UnormSrgb,
    );
    assert_eq!(composite.encode_srgb, 0);

    let sky = Color::from_hex(FALLBACK_BACKGROUND);
    let out = composite.resolve(texel(sky, 0.0));
    assert_eq!(out, [sky.r, sky.g, sky.b]);
}
