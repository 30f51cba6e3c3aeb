use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::warn;

/// Interleaved vertex layout shared by the loader and the GPU pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

/// CPU-side geometry for one mesh of the imported model.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// Texture references named by an MTL material, resolved against the OBJ
/// file's directory.
#[derive(Debug, Clone, Default)]
pub struct MaterialData {
    pub name: String,
    pub diffuse: Option<PathBuf>,
    pub specular: Option<PathBuf>,
}

/// Everything read from an OBJ/MTL pair, ready for GPU upload.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub name: String,
    pub path: PathBuf,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.indices.len() / 3).sum()
    }
}

/// Imports an OBJ model and its MTL materials from disk.
///
/// Faces are triangulated and re-indexed to a single index stream. Meshes
/// without normals get face-averaged ones so the shading stays defined.
pub fn load_obj(path: &Path) -> Result<ModelData> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("unable to import {}", path.display()))?;

    if models.is_empty() {
        return Err(anyhow!("{} does not define any meshes", path.display()));
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let materials = match materials {
        Ok(materials) => materials
            .into_iter()
            .map(|material| convert_material(material, base_dir))
            .collect(),
        Err(err) => {
            warn!("material library for {} not loaded: {err}", path.display());
            Vec::new()
        }
    };

    let meshes = models
        .into_iter()
        .map(|model| convert_mesh(model, materials.len()))
        .collect::<Result<Vec<_>>>()?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    Ok(ModelData {
        name,
        path: path.to_path_buf(),
        meshes,
        materials,
    })
}

fn convert_material(material: tobj::Material, base_dir: &Path) -> MaterialData {
    MaterialData {
        diffuse: material.diffuse_texture.as_deref().map(|t| base_dir.join(t)),
        specular: material
            .specular_texture
            .as_deref()
            .map(|t| base_dir.join(t)),
        name: material.name,
    }
}

fn convert_mesh(model: tobj::Model, material_count: usize) -> Result<MeshData> {
    let mesh = model.mesh;
    let vertex_count = mesh.positions.len() / 3;
    if vertex_count == 0 {
        return Err(anyhow!("mesh {} has no vertices", model.name));
    }

    let has_normals = mesh.normals.len() == mesh.positions.len();
    let mut vertices = (0..vertex_count)
        .map(|i| Vertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            // OBJ places the texture origin in the bottom-left corner; the
            // GPU samples from the top-left.
            tex_coords: [
                mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                1.0 - mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
            ],
            normal: if has_normals {
                [
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                ]
            } else {
                [0.0; 3]
            },
        })
        .collect::<Vec<_>>();

    if !has_normals {
        compute_normals(&mut vertices, &mesh.indices);
    }

    let material = mesh.material_id.filter(|id| *id < material_count);

    Ok(MeshData {
        name: model.name,
        vertices,
        indices: mesh.indices,
        material,
    })
}

/// Fills in per-vertex normals averaged from the adjacent face normals.
fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = Vec3::from_array(vertices[i0].position);
        let p1 = Vec3::from_array(vertices[i1].position);
        let p2 = Vec3::from_array(vertices[i2].position);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (vertex, normal) in vertices.iter_mut().zip(accum) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_obj(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).expect("create obj");
        file.write_all(contents.as_bytes()).expect("write obj");
        path
    }

    #[test]
    fn imports_triangle_and_generates_normals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_obj(
            dir.path(),
            "triangle.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        );

        let model = load_obj(&path).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.triangle_count(), 1);
        for vertex in &model.meshes[0].vertices {
            let normal = Vec3::from_array(vertex.normal);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn resolves_material_textures_against_obj_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("box.mtl"),
            "newmtl painted\nmap_Kd diffuse.png\nmap_Ks specular.png\n",
        )
        .expect("write mtl");
        let path = write_obj(
            dir.path(),
            "box.obj",
            "mtllib box.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl painted\nf 1 2 3\n",
        );

        let model = load_obj(&path).unwrap();
        assert_eq!(model.materials.len(), 1);
        let material = &model.materials[0];
        assert_eq!(material.name, "painted");
        assert_eq!(material.diffuse, Some(dir.path().join("diffuse.png")));
        assert_eq!(material.specular, Some(dir.path().join("specular.png")));
        assert_eq!(model.meshes[0].material, Some(0));
    }

    #[test]
    fn missing_file_is_an_error() {
        let missing = Path::new("does/not/exist.obj");
        assert!(load_obj(missing).is_err());
    }
}
