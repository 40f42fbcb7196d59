//! Armatures and edit bones
//!
//! Bone orientation follows the usual content-tool convention: the bone's
//! local Y axis runs from head to tail and `roll` spins the X/Z axes about it.

use anvil_core::{AnvilError, Result};
use glam::{Mat3, Mat4, Vec3};

/// Directions closer than this to straight down use the degenerate basis
const SAFE_THRESHOLD: f32 = 6.1e-3;
const CRITICAL_THRESHOLD: f32 = 2.5e-4;

/// A bone in edit form
#[derive(Debug, Clone, PartialEq)]
pub struct EditBone {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
    pub roll: f32,
    pub parent: Option<usize>,
}

impl EditBone {
    pub fn new(name: impl Into<String>, head: Vec3, tail: Vec3) -> Self {
        Self {
            name: name.into(),
            head,
            tail,
            roll: 0.0,
            parent: None,
        }
    }

    pub fn length(&self) -> f32 {
        (self.tail - self.head).length()
    }

    /// Rest orientation as a rotation matrix (columns are the bone's X, Y, Z)
    pub fn matrix(&self) -> Mat3 {
        bone_matrix(self.head, self.tail, self.roll)
    }

    /// Full rest transform placed at the head
    pub fn head_transform(&self) -> Mat4 {
        let m = self.matrix();
        Mat4::from_cols(
            m.x_axis.extend(0.0),
            m.y_axis.extend(0.0),
            m.z_axis.extend(0.0),
            self.head.extend(1.0),
        )
    }

    /// Full rest transform placed at the tail, used for bone parenting
    pub fn tail_transform(&self) -> Mat4 {
        let mut m = self.head_transform();
        m.w_axis = self.tail.extend(1.0);
        m
    }
}

/// Rotation for a bone pointing along the normalized `nor` with `roll`
fn roll_to_mat3(nor: Vec3, roll: f32) -> Mat3 {
    let (x, y, z) = (nor.x, nor.y, nor.z);
    let mut theta = 1.0 + y;
    let theta_alt = x * x + z * z;

    let base = if theta > SAFE_THRESHOLD || theta_alt > CRITICAL_THRESHOLD * CRITICAL_THRESHOLD {
        if theta <= SAFE_THRESHOLD {
            // Near -Y the direct form loses precision
            theta = theta_alt * 0.5 + theta_alt * theta_alt * 0.125;
        }
        Mat3::from_cols(
            Vec3::new(1.0 - x * x / theta, -x, -x * z / theta),
            Vec3::new(x, y, z),
            Vec3::new(-x * z / theta, -z, 1.0 - z * z / theta),
        )
    } else {
        Mat3::from_cols(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0), Vec3::Z)
    };

    Mat3::from_axis_angle(nor, roll) * base
}

/// Rest rotation of a bone from head, tail and roll.
///
/// A zero-length bone gets the identity basis rotated by roll about +Y.
pub fn bone_matrix(head: Vec3, tail: Vec3, roll: f32) -> Mat3 {
    let nor = (tail - head).normalize_or_zero();
    if nor == Vec3::ZERO {
        return Mat3::from_axis_angle(Vec3::Y, roll);
    }
    roll_to_mat3(nor, roll)
}

/// Roll that points the bone's Z axis as close as possible to `up`.
///
/// Returns 0 for zero-length bones and when `up` is parallel to the bone.
pub fn roll_to_align(head: Vec3, tail: Vec3, up: Vec3) -> f32 {
    let nor = (tail - head).normalize_or_zero();
    let up = up.normalize_or_zero();
    if nor == Vec3::ZERO || up == Vec3::ZERO {
        return 0.0;
    }
    if nor.dot(up).abs() >= 1.0 - f32::EPSILON {
        return 0.0;
    }

    let z_axis = roll_to_mat3(nor, 0.0).z_axis;
    let projected = up - nor * up.dot(nor);
    let roll = projected.angle_between(z_axis);

    if z_axis.cross(projected).dot(nor) < 0.0 {
        -roll
    } else {
        roll
    }
}

/// Armature data: an ordered list of edit bones
#[derive(Debug, Clone, Default)]
pub struct Armature {
    pub name: String,
    bones: Vec<EditBone>,
}

impl Armature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
        }
    }

    pub fn bones(&self) -> &[EditBone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> Option<&EditBone> {
        self.bones.get(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn find_bone(&self, name: &str) -> Option<&EditBone> {
        self.find(name).and_then(|i| self.bones.get(i))
    }

    /// Add a bone and return its index.
    ///
    /// A bone with the same name is overwritten in place; its slot and
    /// parent link are kept.
    pub fn add_bone(&mut self, bone: EditBone) -> usize {
        match self.find(&bone.name) {
            Some(index) => {
                let existing = &mut self.bones[index];
                existing.head = bone.head;
                existing.tail = bone.tail;
                existing.roll = bone.roll;
                index
            }
            None => {
                self.bones.push(bone);
                self.bones.len() - 1
            }
        }
    }

    /// Direct children of a bone
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// True if `ancestor` is on the parent chain of `index` (or is `index`)
    pub fn is_ancestor(&self, ancestor: usize, index: usize) -> bool {
        let mut current = Some(index);
        let mut steps = 0;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.bones.len() {
                break;
            }
            current = self.bones.get(i).and_then(|b| b.parent);
        }
        false
    }

    /// Link `child` under `parent`, refusing links that would form a cycle
    pub fn set_parent(&mut self, child: usize, parent: Option<usize>) -> Result<()> {
        let count = self.bones.len();
        if child >= count {
            return Err(AnvilError::InvalidIndex {
                what: "bone",
                index: child as i64,
                count,
            });
        }
        if let Some(p) = parent {
            if p >= count {
                return Err(AnvilError::InvalidIndex {
                    what: "parent bone",
                    index: p as i64,
                    count,
                });
            }
            if self.is_ancestor(child, p) {
                return Err(AnvilError::HierarchyError(format!(
                    "parenting '{}' to '{}' would form a cycle",
                    self.bones[child].name, self.bones[p].name
                )));
            }
        }
        self.bones[child].parent = parent;
        Ok(())
    }

    /// Remove a bone. Its children move up to its parent and later bone
    /// indices shift down by one.
    pub fn remove_bone(&mut self, index: usize) -> Result<EditBone> {
        if index >= self.bones.len() {
            return Err(AnvilError::InvalidIndex {
                what: "bone",
                index: index as i64,
                count: self.bones.len(),
            });
        }

        let removed = self.bones.remove(index);
        for bone in &mut self.bones {
            if bone.parent == Some(index) {
                bone.parent = removed.parent;
            }
            if let Some(p) = bone.parent {
                if p > index {
                    bone.parent = Some(p - 1);
                }
            }
        }
        Ok(removed)
    }

    /// Bones with no parent
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
    }
}
