use glam::{Mat3, Mat4, Vec3};
use gltf::buffer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to turn a GLB blob into mesh buffers.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Gltf(#[from] gltf::Error),
    #[error("index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
}

/// GPU ready mesh buffers extracted from one glTF primitive.
///
/// Vertices are laid out as `position.xyz` followed by `normal.xyz`, with
/// the owning node's world transform already baked in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Decodes a binary glTF (`.glb`) blob into flat mesh buffers.
///
/// Walks the default scene's node hierarchy and flattens every primitive
/// into world space. Files without a scene or without meshes decode to an
/// empty list rather than an error.
pub fn decode_glb(data: &[u8]) -> Result<Vec<MeshData>, DecodeError> {
    let (document, buffers, _images) = gltf::import_slice(data)?;
    let mut meshes = Vec::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut meshes)?;
        }
    }
    Ok(meshes)
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[buffer::Data],
    out: &mut Vec<MeshData>,
) -> Result<(), DecodeError> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(data) = read_primitive(&primitive, transform, buffers)? {
                out.push(data);
            }
        }
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, out)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    transform: Mat4,
    buffers: &[buffer::Data],
) -> Result<Option<MeshData>, DecodeError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let Some(positions) = reader.read_positions() else {
        return Ok(None);
    };
    let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|normals| normals.map(Vec3::from).collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    // The index accessor is not validated against the position count by the
    // parser; a stray index would otherwise read past the vertex buffers.
    for &index in &indices {
        if index as usize >= positions.len() {
            return Err(DecodeError::IndexOutOfBounds {
                index,
                vertex_count: positions.len(),
            });
        }
    }

    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    let mut vertices = Vec::with_capacity(positions.len() * 6);
    for (index, position) in positions.iter().enumerate() {
        let world = transform.transform_point3(*position);
        vertices.extend_from_slice(&[world.x, world.y, world.z]);
        let normal = normals
            .as_ref()
            .and_then(|normals| normals.get(index).copied())
            .map(|normal| (normal_matrix * normal).normalize_or_zero())
            .unwrap_or(Vec3::ZERO);
        vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
    }

    let mut mesh = MeshData { vertices, indices };
    if needs_normals(&mesh.vertices) {
        compute_normals(&mut mesh);
    }
    Ok(Some(mesh))
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(6)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

fn compute_normals(mesh: &mut MeshData) {
    let vertex_count = mesh.vertices.len() / 6;
    let mut accum = vec![Vec3::ZERO; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = Vec3::from_slice(&mesh.vertices[i0 * 6..i0 * 6 + 3]);
        let p1 = Vec3::from_slice(&mesh.vertices[i1 * 6..i1 * 6 + 3]);
        let p2 = Vec3::from_slice(&mesh.vertices[i2 * 6..i2 * 6 + 3]);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * 6 + 3] = normal.x;
        mesh.vertices[i * 6 + 4] = normal.y;
        mesh.vertices[i * 6 + 5] = normal.z;
    }
}

#[cfg(test)]
pub(crate) mod test_glb {
    /// Builds a GLB with a single triangle in the XY plane and no normals.
    pub fn triangle_glb() -> Vec<u8> {
        triangle_glb_with_indices([0, 1, 2])
    }

    /// Same triangle geometry, but with a caller-chosen index buffer. The
    /// parser accepts index values the position accessor cannot satisfy.
    pub fn triangle_glb_with_indices(indices: [u16; 3]) -> Vec<u8> {
        let json = br#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0}],"meshes":[{"primitives":[{"attributes":{"POSITION":0},"indices":1}]}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]},{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}],"bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36},{"buffer":0,"byteOffset":36,"byteLength":6}],"buffers":[{"byteLength":44}]}"#;

        let mut bin = Vec::new();
        for value in [
            0.0f32, 0.0, 0.0, // v0
            1.0, 0.0, 0.0, // v1
            0.0, 1.0, 0.0, // v2
        ] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for index in indices {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        assemble_glb(json, Some(&bin))
    }

    /// Builds a GLB whose scene is valid but contains no meshes.
    pub fn empty_scene_glb() -> Vec<u8> {
        let json = br#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[]}]}"#;
        assemble_glb(json, None)
    }

    pub fn assemble_glb(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
        let mut json_chunk = json.to_vec();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let mut bin_chunk = bin.map(<[u8]>::to_vec);
        if let Some(chunk) = bin_chunk.as_mut() {
            while chunk.len() % 4 != 0 {
                chunk.push(0);
            }
        }

        let mut total = 12 + 8 + json_chunk.len();
        if let Some(chunk) = &bin_chunk {
            total += 8 + chunk.len();
        }

        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json_chunk);
        if let Some(chunk) = &bin_chunk {
            glb.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
            glb.extend_from_slice(b"BIN\0");
            glb.extend_from_slice(chunk);
        }
        glb
    }
}
