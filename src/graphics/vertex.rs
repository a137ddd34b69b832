use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Two triangles showing the frame at its aspect ratio inside the window,
/// with bars on whichever axis has room to spare.
pub fn letterboxed_quad(frame: (u32, u32), window: (u32, u32)) -> [Vertex; 6] {
    let frame_aspect = frame.0.max(1) as f32 / frame.1.max(1) as f32;
    let window_aspect = window.0.max(1) as f32 / window.1.max(1) as f32;
    let (sx, sy) = if window_aspect > frame_aspect {
        (frame_aspect / window_aspect, 1.0)
    } else {
        (1.0, window_aspect / frame_aspect)
    };

    let v = |x: f32, y: f32, u: f32, t: f32| Vertex {
        position: [x * sx, y * sy],
        tex_coords: [u, t],
    };
    [
        v(-1.0, -1.0, 0.0, 1.0),
        v(1.0, -1.0, 1.0, 1.0),
        v(1.0, 1.0, 1.0, 0.0),
        v(-1.0, -1.0, 0.0, 1.0),
        v(1.0, 1.0, 1.0, 0.0),
        v(-1.0, 1.0, 0.0, 0.0),
    ]
}

pub struct VertexBuffer {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

impl VertexBuffer {
    pub fn new(device: &wgpu::Device, vertices: &[Vertex]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Quad"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, vertices: &[Vertex]) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(vertices));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_aspect_fills_window() {
        let quad = letterboxed_quad((1920, 1080), (1280, 720));
        assert_eq!(quad[0].position, [-1.0, -1.0]);
        assert_eq!(quad[2].position, [1.0, 1.0]);
    }

    #[test]
    fn wide_window_gets_side_bars() {
        let quad = letterboxed_quad((1000, 1000), (2000, 1000));
        assert_eq!(quad[1].position, [0.5, -1.0]);
    }

    #[test]
    fn tall_window_gets_top_and_bottom_bars() {
        let quad = letterboxed_quad((2000, 1000), (1000, 1000));
        assert_eq!(quad[2].position, [1.0, 0.5]);
    }
}
