#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_upload_and_release_environment_cube() {
    use common::fixtures;
    use scene_viewer::data_structures::texture::Texture;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .expect("no adapter available");
    let (device, queue) =
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
            .expect("failed to create device");

    let env = fixtures::uniform_environment(fixtures::small_prefilter());
    let cube = Texture::from_environment(&device, &queue, &env);
    assert_eq!(cube.texture.mip_level_count(), env.mip_count());
    assert_eq!(cube.texture.depth_or_array_layers(), 6);
    assert_eq!(cube.texture.width(), env.face_size());
    queue.submit(std::iter::empty());
    cube.destroy();

    let empty = Texture::create_empty_cube(&device, &queue);
    assert_eq!(empty.texture.mip_level_count(), 1);
    empty.destroy();
}
