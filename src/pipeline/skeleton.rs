use ab_glyph::{FontRef, PxScale};
use anyhow::{Result, anyhow};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::pipeline::topology::Topology;
use crate::types::ParsedPoses;

pub const JOINT_RADIUS: i32 = 8;
pub const LIMB_THICKNESS: i32 = 3;
const JOINT_COLOR: [u8; 4] = [244, 67, 54, 255];
const LIMB_COLOR: [u8; 4] = [0, 255, 0, 255];
const LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LABEL_SCALE: f32 = 24.0;
const LABEL_ORIGIN: (i32, i32) = (12, 12);

/// Maps a normalized `(x, y)` joint onto a `width × height` canvas.
pub fn project_to_pixels(point: (f32, f32), width: u32, height: u32) -> (f32, f32) {
    (point.0 * width as f32, point.1 * height as f32)
}

/// Draws every skeleton of `poses` onto an RGBA buffer: one line per limb
/// whose two joints were found, then one dot per joint.
pub fn draw_poses(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    poses: &ParsedPoses,
    topology: &Topology,
) {
    for skeleton in &poses.skeletons {
        let points: Vec<Option<(f32, f32)>> = poses
            .normalized_points(skeleton)
            .into_iter()
            .map(|p| p.map(|p| project_to_pixels(p, width, height)))
            .collect();

        for edge in topology.edges() {
            if let (Some(Some(pa)), Some(Some(pb))) =
                (points.get(edge.source), points.get(edge.target))
            {
                draw_line(buffer, width, height, pa, pb, LIMB_COLOR, LIMB_THICKNESS);
            }
        }

        for &(x, y) in points.iter().flatten() {
            draw_circle(
                buffer,
                width,
                height,
                (x as i32, y as i32),
                JOINT_RADIUS,
                JOINT_COLOR,
            );
        }
    }
}

/// Font used by [`draw_frame_index`], embedded in the binary.
pub fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT)
        .map_err(|err| anyhow!("embedded label font is invalid: {err}"))
}

/// Writes `FRAME <index>` in the top-left corner.
pub fn draw_frame_index(image: &mut RgbaImage, font: &FontRef<'_>, frame_index: u64) {
    let label = format!("FRAME {frame_index}");
    draw_text_mut(
        image,
        LABEL_COLOR,
        LABEL_ORIGIN.0,
        LABEL_ORIGIN.1,
        PxScale::from(LABEL_SCALE),
        font,
        &label,
    );
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Peak, Skeleton};

    fn pixel(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * width + x) as usize) * 4;
        [buffer[idx], buffer[idx + 1], buffer[idx + 2], buffer[idx + 3]]
    }

    fn peak(x: f32, y: f32) -> Peak {
        Peak {
            row: 0,
            col: 0,
            y,
            x,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_project_to_pixels() {
        assert_eq!(project_to_pixels((0.5, 0.25), 200, 100), (100.0, 25.0));
    }

    #[test]
    fn test_draw_poses_marks_joints_and_limbs() {
        let (width, height) = (100u32, 100u32);
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let poses = ParsedPoses {
            peaks: vec![vec![peak(0.2, 0.5)], vec![peak(0.8, 0.5)]],
            skeletons: vec![Skeleton::from_parts(vec![Some(0), Some(0)])],
        };
        let topology = Topology::from(&[[0, 1, 0, 1]][..]);
        draw_poses(&mut buffer, width, height, &poses, &topology);

        assert_eq!(pixel(&buffer, width, 20, 50), JOINT_COLOR);
        assert_eq!(pixel(&buffer, width, 80, 50), JOINT_COLOR);
        assert_eq!(pixel(&buffer, width, 50, 50), LIMB_COLOR);
        assert_eq!(pixel(&buffer, width, 50, 10), [0, 0, 0, 0]);
    }

    #[test]
    fn test_missing_part_draws_no_limb() {
        let (width, height) = (64u32, 64u32);
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let poses = ParsedPoses {
            peaks: vec![vec![peak(0.1, 0.5)], Vec::new()],
            skeletons: vec![Skeleton::from_parts(vec![Some(0), None])],
        };
        let topology = Topology::from(&[[0, 1, 0, 1]][..]);
        draw_poses(&mut buffer, width, height, &poses, &topology);
        assert_eq!(pixel(&buffer, width, 40, 32), [0, 0, 0, 0]);
    }

    #[test]
    fn test_drawing_clips_at_borders() {
        let (width, height) = (16u32, 16u32);
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let poses = ParsedPoses {
            peaks: vec![vec![peak(0.0, 0.0)], vec![peak(1.0, 1.0)]],
            skeletons: vec![Skeleton::from_parts(vec![Some(0), Some(0)])],
        };
        let topology = Topology::from(&[[0, 1, 0, 1]][..]);
        draw_poses(&mut buffer, width, height, &poses, &topology);
        assert_eq!(pixel(&buffer, width, 0, 0), JOINT_COLOR);
    }

    fn inked(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p.0 != [0, 0, 0, 0]).count()
    }

    #[test]
    fn test_frame_index_label() {
        let font = label_font().unwrap();
        let mut image = RgbaImage::new(320, 60);
        draw_frame_index(&mut image, &font, 7);

        let (text_width, _) =
            imageproc::drawing::text_size(PxScale::from(LABEL_SCALE), &font, "FRAME 7");
        assert!(inked(&image) > 0);
        let right_edge = (LABEL_ORIGIN.0 as u32 + text_width + 4).min(image.width());
        for (x, _, pixel) in image.enumerate_pixels() {
            if x >= right_edge {
                assert_eq!(pixel.0, [0, 0, 0, 0]);
            }
        }
    }

    #[test]
    fn test_longer_index_draws_more() {
        let font = label_font().unwrap();
        let mut short = RgbaImage::new(320, 60);
        let mut long = RgbaImage::new(320, 60);
        draw_frame_index(&mut short, &font, 1);
        draw_frame_index(&mut long, &font, 1_234_567);
        assert!(inked(&long) > inked(&short));
    }

    #[test]
    fn test_label_clips_on_tiny_image() {
        let font = label_font().unwrap();
        let mut image = RgbaImage::new(8, 8);
        draw_frame_index(&mut image, &font, 42);
        assert_eq!(inked(&image), 0);
    }
}
