//! Per-draw transform pushed to the vertex stage.

/// Size in bytes of the pushed transform (one 4x4 `f32` matrix).
pub const TRANSFORM_SIZE: u32 = 64;

/// Map a depth value into the active depth convention.
///
/// With reversed depth (near = 1.0, far = 0.0) the value is mirrored.
pub fn adjusted_depth(depth: f32, reverse_z: bool) -> f32 {
    if reverse_z {
        1.0 - depth
    } else {
        depth
    }
}

/// Rotation about the Z axis by `time` radians, translated to `depth` along Z.
///
/// Laid out as the shader consumes it: element 14 carries the depth.
pub fn spin_transform(time: f32, depth: f32, reverse_z: bool) -> [f32; 16] {
    let (sin, cos) = time.sin_cos();
    let depth = adjusted_depth(depth, reverse_z);
    [
        cos, -sin, 0.0, 0.0, //
        sin, cos, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, depth, 1.0,
    ]
}
