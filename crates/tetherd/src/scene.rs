//! In-memory scene toolset.
//!
//! Stands in for a real host application's object model so the server can be
//! exercised end to end. Every handler runs on the host context; the mutex
//! only satisfies the handler bounds and is never contended.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};
use tether_protocol::ParamMap;

use crate::registry::params::{optional_bool, optional_str, optional_vec3, require_str};
use crate::registry::{CommandOutcome, ToolFailure, ToolModule, ToolSpec};

const ORIGIN: [f64; 3] = [0.0, 0.0, 0.0];
const UNIT_SCALE: [f64; 3] = [1.0, 1.0, 1.0];

/// Kind of object held by a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Unit cube mesh.
    Cube,
    /// UV sphere mesh.
    Sphere,
    /// Flat plane mesh.
    Plane,
    /// Cylinder mesh.
    Cylinder,
    /// Camera.
    Camera,
    /// Point light.
    Light,
    /// Transform-only placeholder.
    Empty,
}

impl ObjectKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "cube" => Some(Self::Cube),
            "sphere" => Some(Self::Sphere),
            "plane" => Some(Self::Plane),
            "cylinder" => Some(Self::Cylinder),
            "camera" => Some(Self::Camera),
            "light" => Some(Self::Light),
            "empty" => Some(Self::Empty),
            _ => None,
        }
    }

    /// Object category reported to clients.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Cube | Self::Sphere | Self::Plane | Self::Cylinder => "MESH",
            Self::Camera => "CAMERA",
            Self::Light => "LIGHT",
            Self::Empty => "EMPTY",
        }
    }

    const fn base_name(self) -> &'static str {
        match self {
            Self::Cube => "Cube",
            Self::Sphere => "Sphere",
            Self::Plane => "Plane",
            Self::Cylinder => "Cylinder",
            Self::Camera => "Camera",
            Self::Light => "Light",
            Self::Empty => "Empty",
        }
    }
}

/// One object in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Unique object name.
    pub name: String,
    /// Object kind.
    pub kind: ObjectKind,
    /// World-space location.
    pub location: [f64; 3],
    /// Euler rotation in radians.
    pub rotation: [f64; 3],
    /// Per-axis scale.
    pub scale: [f64; 3],
}

impl SceneObject {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.kind.category(),
            "location": self.location,
            "rotation_euler": self.rotation,
            "scale": self.scale,
        })
    }
}

/// Scene state owned by the host context.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene name.
    pub name: String,
    /// Current frame.
    pub frame_current: i64,
    /// First frame of the playback range.
    pub frame_start: i64,
    /// Last frame of the playback range.
    pub frame_end: i64,
    /// Playback rate.
    pub fps: u32,
    objects: Vec<SceneObject>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            name: "Scene".to_owned(),
            frame_current: 1,
            frame_start: 1,
            frame_end: 250,
            fps: 24,
            objects: Vec::new(),
        }
    }
}

impl Scene {
    /// Objects in creation order.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Looks up an object by exact name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    /// Adds an object, suffixing the requested name when it is taken.
    pub fn add(&mut self, kind: ObjectKind, requested: Option<&str>) -> &SceneObject {
        let base = requested.unwrap_or_else(|| kind.base_name());
        let name = self.unique_name(base);
        self.objects.push(SceneObject {
            name,
            kind,
            location: ORIGIN,
            rotation: ORIGIN,
            scale: UNIT_SCALE,
        });
        let index = self.objects.len() - 1;
        &self.objects[index]
    }

    /// Removes an object by name.
    pub fn remove(&mut self, name: &str) -> Option<SceneObject> {
        let index = self.objects.iter().position(|object| object.name == name)?;
        Some(self.objects.remove(index))
    }

    fn object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.name == name)
    }

    fn unique_name(&self, base: &str) -> String {
        if self.object(base).is_none() {
            return base.to_owned();
        }
        (1_u32..)
            .map(|suffix| format!("{base}.{suffix:03}"))
            .find(|candidate| self.object(candidate).is_none())
            .unwrap_or_else(|| base.to_owned())
    }

    fn names_of(&self, category: &str) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|object| object.kind.category() == category)
            .map(|object| object.name.as_str())
            .collect()
    }
}

type SceneOperation = fn(&mut Scene, &ParamMap) -> CommandOutcome;

/// Tool module exposing a shared [`Scene`].
#[derive(Debug, Clone, Default)]
pub struct SceneTools {
    scene: Arc<Mutex<Scene>>,
}

impl SceneTools {
    /// Wraps an existing scene.
    #[must_use]
    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene: Arc::new(Mutex::new(scene)),
        }
    }

    /// Copy of the current scene state.
    #[must_use]
    pub fn snapshot(&self) -> Scene {
        lock(&self.scene).clone()
    }

    fn tool(&self, name: &str, description: &str, operation: SceneOperation) -> ToolSpec {
        let scene = Arc::clone(&self.scene);
        ToolSpec::new(name, move |params: &ParamMap| {
            operation(&mut lock(&scene), params)
        })
        .describe(description)
    }
}

impl ToolModule for SceneTools {
    fn name(&self) -> &str {
        "scene"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            self.tool(
                "get_scene_info",
                "Summarise the scene and its objects",
                get_scene_info,
            ),
            self.tool(
                "create_object",
                "Create an object of the given type",
                create_object,
            ),
            self.tool("delete_object", "Delete an object by name", delete_object),
            self.tool(
                "transform_object",
                "Set or offset an object's location, rotation and scale",
                transform_object,
            ),
            self.tool(
                "get_object_info",
                "Describe a single object",
                get_object_info,
            ),
        ]
    }
}

fn lock(scene: &Mutex<Scene>) -> MutexGuard<'_, Scene> {
    scene.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(name: &str) -> ToolFailure {
    ToolFailure::not_found(format!("Object '{name}' not found"))
}

fn get_scene_info(scene: &mut Scene, _params: &ParamMap) -> CommandOutcome {
    let objects: Vec<Value> = scene
        .objects
        .iter()
        .map(|object| {
            json!({
                "name": object.name,
                "type": object.kind.category(),
                "location": object.location,
            })
        })
        .collect();
    Ok(json!({
        "name": scene.name,
        "frame_current": scene.frame_current,
        "frame_start": scene.frame_start,
        "frame_end": scene.frame_end,
        "fps": scene.fps,
        "object_count": objects.len(),
        "objects": objects,
        "cameras": scene.names_of("CAMERA"),
        "lights": scene.names_of("LIGHT"),
        "meshes": scene.names_of("MESH"),
    }))
}

fn create_object(scene: &mut Scene, params: &ParamMap) -> CommandOutcome {
    let raw_kind = optional_str(params, "type")?.unwrap_or("cube");
    let kind = ObjectKind::parse(raw_kind).ok_or_else(|| {
        ToolFailure::invalid_params(format!("unsupported object type '{raw_kind}'"))
    })?;
    let requested = optional_str(params, "name")?.filter(|name| !name.is_empty());
    let location = optional_vec3(params, "location")?.unwrap_or(ORIGIN);
    let rotation = optional_vec3(params, "rotation")?.unwrap_or(ORIGIN);
    let scale = optional_vec3(params, "scale")?.unwrap_or(UNIT_SCALE);

    let name = scene.add(kind, requested).name.clone();
    let object = scene.object_mut(&name).ok_or_else(|| not_found(&name))?;
    object.location = location;
    object.rotation = rotation;
    object.scale = scale;
    Ok(object.to_json())
}

fn delete_object(scene: &mut Scene, params: &ParamMap) -> CommandOutcome {
    let name = require_str(params, "name")?;
    scene.remove(name).ok_or_else(|| not_found(name))?;
    Ok(json!({ "deleted": name }))
}

fn transform_object(scene: &mut Scene, params: &ParamMap) -> CommandOutcome {
    let name = require_str(params, "name")?;
    let delta = optional_bool(params, "delta", false)?;
    let location = optional_vec3(params, "location")?;
    let rotation = optional_vec3(params, "rotation")?;
    let scale = optional_vec3(params, "scale")?;
    if location.is_none() && rotation.is_none() && scale.is_none() {
        return Err(ToolFailure::invalid_params(
            "Provide at least one of location/rotation/scale",
        ));
    }

    let object = scene.object_mut(name).ok_or_else(|| not_found(name))?;
    if let Some(location) = location {
        object.location = if delta {
            combine(object.location, location, |current, offset| current + offset)
        } else {
            location
        };
    }
    if let Some(rotation) = rotation {
        object.rotation = if delta {
            combine(object.rotation, rotation, |current, offset| current + offset)
        } else {
            rotation
        };
    }
    if let Some(scale) = scale {
        object.scale = if delta {
            combine(object.scale, scale, |current, factor| current * factor)
        } else {
            scale
        };
    }
    Ok(object.to_json())
}

fn get_object_info(scene: &mut Scene, params: &ParamMap) -> CommandOutcome {
    let name = require_str(params, "name")?;
    scene
        .object(name)
        .map(SceneObject::to_json)
        .ok_or_else(|| not_found(name))
}

fn combine(current: [f64; 3], change: [f64; 3], apply: impl Fn(f64, f64) -> f64) -> [f64; 3] {
    [
        apply(current[0], change[0]),
        apply(current[1], change[1]),
        apply(current[2], change[2]),
    ]
}
