use std::path::PathBuf;

use anyhow::Result;
use log::warn;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::loader::ModelData;
use crate::texture::{Texture, TextureKind};

/// Lifetime violations on GPU resources that the viewer detects instead of
/// leaving to the graphics API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{0} was used after its GPU resources were released")]
    UseAfterRelease(String),
    #[error("{0} was released twice")]
    DoubleRelease(String),
}

/// Tracks whether a resource's GPU handles are still valid.
#[derive(Debug, Default)]
struct LifetimeFlag {
    released: bool,
}

impl LifetimeFlag {
    fn release(&mut self, owner: &str) -> Result<(), ResourceError> {
        if self.released {
            return Err(ResourceError::DoubleRelease(owner.to_string()));
        }
        self.released = true;
        Ok(())
    }

    fn ensure_live(&self, owner: &str) -> Result<(), ResourceError> {
        if self.released {
            return Err(ResourceError::UseAfterRelease(owner.to_string()));
        }
        Ok(())
    }
}

/// Phong material: a diffuse and a specular map bound as one group.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse: Texture,
    pub specular: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse: Texture,
        specular: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name}-material")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&specular.sampler),
                },
            ],
        });
        Self {
            name: name.to_string(),
            diffuse,
            specular,
            bind_group,
        }
    }
}

/// Uploaded geometry for one mesh: vertex/index buffers plus its material
/// slot.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
    pub material: usize,
}

/// A model resident on the GPU: ordered meshes, their materials, and source
/// metadata.
///
/// The model owns its buffers and textures. [`Model::release`] frees them
/// exactly once; any later draw is rejected with
/// [`ResourceError::UseAfterRelease`] rather than dereferencing a dangling
/// handle.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub path: PathBuf,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    lifetime: LifetimeFlag,
}

impl Model {
    /// Uploads loader output to the GPU.
    ///
    /// Texture files that are missing or fail to decode are replaced by
    /// solid fallbacks so a model with a broken MTL still renders.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &ModelData,
        layout: &wgpu::BindGroupLayout,
    ) -> Result<Self> {
        let mut materials = Vec::with_capacity(data.materials.len() + 1);
        for source in &data.materials {
            let diffuse = load_texture_or_fallback(
                device,
                queue,
                source.diffuse.as_deref(),
                &format!("{}-diffuse", source.name),
                TextureKind::Diffuse,
            );
            let specular = load_texture_or_fallback(
                device,
                queue,
                source.specular.as_deref(),
                &format!("{}-specular", source.name),
                TextureKind::Specular,
            );
            materials.push(Material::new(device, &source.name, diffuse, specular, layout));
        }

        // Slot for meshes whose OBJ group references no material.
        let fallback_material = materials.len();
        materials.push(Material::new(
            device,
            "untextured",
            Texture::solid(device, queue, WHITE, "untextured-diffuse", TextureKind::Diffuse),
            Texture::solid(
                device,
                queue,
                DARK_GRAY,
                "untextured-specular",
                TextureKind::Specular,
            ),
            layout,
        ));

        let meshes = data
            .meshes
            .iter()
            .map(|mesh| Mesh {
                name: mesh.name.clone(),
                vertex: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{}-vertices", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{}-indices", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
                material: mesh.material.unwrap_or(fallback_material),
            })
            .collect();

        Ok(Self {
            name: data.name.clone(),
            path: data.path.clone(),
            meshes,
            materials,
            lifetime: LifetimeFlag::default(),
        })
    }

    /// Creates a model with no GPU resources. Only the lifetime accounting
    /// is meaningful on such a model.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            lifetime: LifetimeFlag::default(),
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn material(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    /// Fails if the model's GPU resources have been released.
    pub fn ensure_live(&self) -> Result<(), ResourceError> {
        self.lifetime.ensure_live(&self.name)
    }

    /// Frees every vertex/index buffer and texture owned by the model.
    ///
    /// Must be called once, after the last draw. A second call reports
    /// [`ResourceError::DoubleRelease`] and touches nothing.
    pub fn release(&mut self) -> Result<(), ResourceError> {
        self.lifetime.release(&self.name)?;
        for mesh in &self.meshes {
            mesh.vertex.destroy();
            mesh.index.destroy();
        }
        for material in &self.materials {
            material.diffuse.texture.destroy();
            material.specular.texture.destroy();
        }
        Ok(())
    }
}

const WHITE: [u8; 4] = [255, 255, 255, 255];
const DARK_GRAY: [u8; 4] = [30, 30, 30, 255];

fn load_texture_or_fallback(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: Option<&std::path::Path>,
    label: &str,
    kind: TextureKind,
) -> Texture {
    let fallback = match kind {
        TextureKind::Diffuse => WHITE,
        TextureKind::Specular => DARK_GRAY,
    };
    let Some(path) = path else {
        return Texture::solid(device, queue, fallback, label, kind);
    };
    match std::fs::read(path) {
        Ok(bytes) => match Texture::from_bytes(device, queue, &bytes, label, kind) {
            Ok(texture) => texture,
            Err(err) => {
                warn!("{label}: {err:?}");
                Texture::solid(device, queue, fallback, label, kind)
            }
        },
        Err(err) => {
            warn!("{label}: unable to read {}: {err}", path.display());
            Texture::solid(device, queue, fallback, label, kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_after_release_is_flagged() {
        let mut model = Model::empty("backpack");
        assert!(model.ensure_live().is_ok());
        model.release().unwrap();
        assert_eq!(
            model.ensure_live(),
            Err(ResourceError::UseAfterRelease("backpack".to_string()))
        );
    }

    #[test]
    fn double_release_is_flagged() {
        let mut model = Model::empty("backpack");
        model.release().unwrap();
        assert_eq!(
            model.release(),
            Err(ResourceError::DoubleRelease("backpack".to_string()))
        );
    }
}
