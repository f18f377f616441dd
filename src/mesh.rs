// mesh.rs — 反向立方体/球体几何，以及方向到立方体面的映射

#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

pub const CUBE_SIZE: f32 = 100.0;
pub const SPHERE_RADIUS: f32 = 500.0;
pub const SPHERE_LAT_SEGMENTS: usize = 40;
pub const SPHERE_LON_SEGMENTS: usize = 60;

/// Box of edge `size` centred on the origin, wound so the inside faces the camera.
pub fn build_inverted_cube(size: f32) -> Mesh {
    let h = size / 2.0;
    let positions = vec![
        [-h, -h, -h],
        [h, -h, -h],
        [h, h, -h],
        [-h, h, -h],
        [-h, -h, h],
        [h, -h, h],
        [h, h, h],
        [-h, h, h],
    ];

    // two triangles per face, counter-clockwise when seen from the centre
    // order: +X, -X, +Y, -Y, -Z, +Z
    let faces: [[u32; 4]; 6] = [
        [1, 5, 6, 2],
        [4, 0, 3, 7],
        [3, 2, 6, 7],
        [4, 5, 1, 0],
        [0, 1, 2, 3],
        [5, 4, 7, 6],
    ];

    let mut indices = Vec::with_capacity(36);
    for [a, b, c, d] in faces {
        indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    Mesh { positions, indices }
}

/// UV sphere centred on the origin.
pub fn build_sphere(radius: f32, lat: usize, lon: usize) -> Mesh {
    let mut positions = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let theta = std::f32::consts::PI * (i as f32) / (lat as f32);
        let y = radius * theta.cos();
        let sin_t = theta.sin();

        for j in 0..=lon {
            let phi = 2.0 * std::f32::consts::PI * (j as f32) / (lon as f32);
            positions.push([radius * phi.cos() * sin_t, y, radius * phi.sin() * sin_t]);
        }
    }

    for i in 0..lat {
        for j in 0..lon {
            let a = (i * (lon + 1) + j) as u32;
            let b = a + lon as u32 + 1;

            indices.push(a);
            indices.push(b);
            indices.push(a + 1);

            indices.push(b);
            indices.push(b + 1);
            indices.push(a + 1);
        }
    }

    Mesh { positions, indices }
}

/// Face index and image coordinates (origin top-left) hit by `dir`.
///
/// Faces are numbered +X, -X, +Y, -Y, -Z, +Z. Keep in sync with `face_lookup`
/// in `shader_cube.wgsl`.
pub fn cube_face_lookup(dir: [f32; 3]) -> (u32, f32, f32) {
    let [x, y, z] = dir;
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    let (face, u, v) = if ax >= ay && ax >= az {
        let (py, pz) = (y / ax, z / ax);
        if x > 0.0 {
            (0, (1.0 + pz) * 0.5, (1.0 + py) * 0.5)
        } else {
            (1, (1.0 - pz) * 0.5, (1.0 + py) * 0.5)
        }
    } else if ay >= az {
        let (px, pz) = (x / ay, z / ay);
        if y > 0.0 {
            (2, (1.0 + px) * 0.5, (1.0 + pz) * 0.5)
        } else {
            (3, (1.0 + px) * 0.5, (1.0 - pz) * 0.5)
        }
    } else {
        let (px, py) = (x / az, y / az);
        if z < 0.0 {
            (4, (1.0 + px) * 0.5, (1.0 + py) * 0.5)
        } else {
            (5, (1.0 - px) * 0.5, (1.0 + py) * 0.5)
        }
    };

    (face, u, 1.0 - v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn test_cube_triangles_face_inward() {
        let mesh = build_inverted_cube(CUBE_SIZE);
        assert_eq!(mesh.positions.len(), 8);
        assert_eq!(mesh.indices.len(), 36);

        for tri in mesh.indices.chunks(3) {
            let a = mesh.positions[tri[0] as usize];
            let b = mesh.positions[tri[1] as usize];
            let c = mesh.positions[tri[2] as usize];
            let normal = cross(sub(b, a), sub(c, a));
            // the normal points back at the centre
            assert!(dot(normal, a) < 0.0);
        }
    }

    #[test]
    fn test_cube_face_order_matches_lookup() {
        let mesh = build_inverted_cube(2.0);
        for (face, tri) in mesh.indices.chunks(6).enumerate() {
            let centre = tri.iter().fold([0.0f32; 3], |acc, &i| {
                let p = mesh.positions[i as usize];
                [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
            });
            let (hit, _, _) = cube_face_lookup(centre);
            assert_eq!(hit as usize, face);
        }
    }

    #[test]
    fn test_sphere_vertices_on_radius() {
        let mesh = build_sphere(SPHERE_RADIUS, 8, 12);
        assert_eq!(mesh.positions.len(), 9 * 13);
        assert_eq!(mesh.indices.len(), 8 * 12 * 6);
        for p in &mesh.positions {
            let r = dot(*p, *p).sqrt();
            assert!((r - SPHERE_RADIUS).abs() < 1e-2);
        }
        let max = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max < mesh.positions.len());
    }

    #[test]
    fn test_axis_directions_hit_face_centres() {
        let axes = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0, 1.0],
        ];
        for (expected, dir) in axes.iter().enumerate() {
            let (face, s, t) = cube_face_lookup(*dir);
            assert_eq!(face as usize, expected);
            assert!(close(s, 0.5));
            assert!(close(t, 0.5));
        }
    }

    #[test]
    fn test_up_is_top_of_side_faces() {
        let (face, _, t) = cube_face_lookup([1.0, 0.9, 0.0]);
        assert_eq!(face, 0);
        assert!(t < 0.1);
    }

    #[test]
    fn test_edges_are_continuous() {
        // straddle the +X / -Z edge
        let (fa, sa, ta) = cube_face_lookup([1.0, 0.2, -0.999]);
        let (fb, sb, tb) = cube_face_lookup([0.999, 0.2, -1.0]);
        assert_eq!(fa, 0);
        assert_eq!(fb, 4);
        assert!(sa < 0.01);
        assert!(sb > 0.99);
        assert!((ta - tb).abs() < 1e-2);
    }

    #[test]
    fn test_scale_invariant() {
        let a = cube_face_lookup([0.3, -0.2, 0.8]);
        let b = cube_face_lookup([3.0, -2.0, 8.0]);
        assert_eq!(a.0, b.0);
        assert!(close(a.1, b.1));
        assert!(close(a.2, b.2));
    }
}
