//! In-memory scene: the mesh-construction side of the loader.

use asset::{MeshBuffers, MeshBuilder};
use corelib::{DVec3, bounds::Aabb, normals::smooth_normals};

pub const DEFAULT_MATERIAL: &str = "Standard";

/// Handle to an object stored in a [`Scene`].
pub type ObjectId = usize;

/// A loaded mesh ready for rendering.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshBuffers,
    /// Area-weighted normals recomputed from the triangles.
    pub smooth_normals: Vec<DVec3>,
    pub bounds: Option<Aabb>,
    pub material: &'static str,
}

#[derive(Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Bounds enclosing every object in the scene.
    pub fn bounds(&self) -> Option<Aabb> {
        let corners: Vec<DVec3> = self
            .objects
            .iter()
            .filter_map(|o| o.bounds)
            .flat_map(|b| [b.min, b.max])
            .collect();
        Aabb::from_points(&corners)
    }
}

impl MeshBuilder for Scene {
    type Handle = ObjectId;

    fn build(&mut self, name: &str, mesh: MeshBuffers) -> ObjectId {
        let bounds = Aabb::from_points(mesh.positions());
        let smooth_normals = smooth_normals(mesh.positions(), mesh.indices(), DVec3::Z);
        let id = self.objects.len();
        log::debug!("Scene object #{id} '{name}' bounds={bounds:?}");
        self.objects.push(SceneObject {
            name: name.to_string(),
            mesh,
            smooth_normals,
            bounds,
            material: DEFAULT_MATERIAL,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::dvec3;

    #[test]
    fn build_computes_bounds_and_normals() {
        let raw = asset::obj::parse_str("v 0 0 0\nv 2 0 0\nv 0 3 0\nf 1 2 3\n").unwrap();
        let mesh = MeshBuffers::assemble(raw).unwrap();
        let mut scene = Scene::new();
        let id = scene.build("tri", mesh);
        let obj = scene.get(id).expect("object");
        assert_eq!(obj.name, "tri");
        assert_eq!(obj.material, DEFAULT_MATERIAL);
        let b = obj.bounds.expect("bounds");
        assert_eq!(b.max, dvec3(2.0, 3.0, 0.0));
        assert_eq!(obj.smooth_normals.len(), 3);
    }

    #[test]
    fn scene_bounds_span_all_objects() {
        let mut scene = Scene::new();
        for src in ["v -1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\n", "v 5 5 5\nv 6 5 5\nv 5 6 5\nf 1 2 3\n"] {
            let mesh = MeshBuffers::assemble(asset::obj::parse_str(src).unwrap()).unwrap();
            scene.build("m", mesh);
        }
        let b = scene.bounds().expect("bounds");
        assert_eq!(b.min, dvec3(-1.0, 0.0, 0.0));
        assert_eq!(b.max, dvec3(6.0, 6.0, 5.0));
    }
}
