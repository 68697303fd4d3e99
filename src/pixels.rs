//! Conversion of surface data to 8-bit RGBA.
//!
//! | Format          | Texel   | Notes |
//! |-----------------|---------|-------|
//! | Color           | 4 bytes | already RGBA8 |
//! | Bgr565          | u16     | opaque |
//! | Bgra5551        | u16     | 1-bit alpha |
//! | Bgra4444        | u16     | |
//! | Alpha8          | u8      | black with alpha |
//! | NormalizedByte4 | 4 × i8  | signed, remapped to 0-255 |
//! | Rgba1010102     | u32     | R in the low bits |
//! | Rgba64          | 4 × u16 | |
//! | Dxt1/3/5        | 4×4 blocks | BC1, BC2, BC3 |
//!
//! Other formats (floating point, two-channel) are not converted.

use crate::content::SurfaceFormat;

/// Whether [`to_rgba8`] can convert `format`.
pub fn is_convertible(format: SurfaceFormat) -> bool {
    use SurfaceFormat::*;
    matches!(
        format,
        Color
            | Bgr565
            | Bgra5551
            | Bgra4444
            | Alpha8
            | NormalizedByte4
            | Rgba1010102
            | Rgba64
            | Dxt1
            | Dxt3
            | Dxt5
    )
}

/// Convert one `width` × `height` image to tightly packed RGBA8.
///
/// Returns `None` for formats that cannot be converted or when `data` is too
/// short for the given dimensions.
pub fn to_rgba8(format: SurfaceFormat, width: u32, height: u32, data: &[u8]) -> Option<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    let texels = w.checked_mul(h)?;
    match format {
        SurfaceFormat::Color => Some(data.get(..texels.checked_mul(4)?)?.to_vec()),
        SurfaceFormat::Bgr565 => map_texels::<2>(data, texels, |t| {
            let c = u16::from_le_bytes(t);
            [
                expand5((c >> 11) as u8),
                expand6((c >> 5) as u8),
                expand5(c as u8),
                0xFF,
            ]
        }),
        SurfaceFormat::Bgra5551 => map_texels::<2>(data, texels, |t| {
            let c = u16::from_le_bytes(t);
            [
                expand5((c >> 10) as u8),
                expand5((c >> 5) as u8),
                expand5(c as u8),
                if c & 0x8000 != 0 { 0xFF } else { 0 },
            ]
        }),
        SurfaceFormat::Bgra4444 => map_texels::<2>(data, texels, |t| {
            let c = u16::from_le_bytes(t);
            [
                ((c >> 8) & 0xF) as u8 * 17,
                ((c >> 4) & 0xF) as u8 * 17,
                (c & 0xF) as u8 * 17,
                (c >> 12) as u8 * 17,
            ]
        }),
        SurfaceFormat::Alpha8 => map_texels::<1>(data, texels, |[a]| [0, 0, 0, a]),
        SurfaceFormat::NormalizedByte4 => map_texels::<4>(data, texels, |t| t.map(snorm8)),
        SurfaceFormat::Rgba1010102 => map_texels::<4>(data, texels, |t| {
            let c = u32::from_le_bytes(t);
            [
                ((c & 0x3FF) >> 2) as u8,
                (((c >> 10) & 0x3FF) >> 2) as u8,
                (((c >> 20) & 0x3FF) >> 2) as u8,
                (c >> 30) as u8 * 85,
            ]
        }),
        SurfaceFormat::Rgba64 => map_texels::<8>(data, texels, |t| {
            [t[1], t[3], t[5], t[7]]
        }),
        SurfaceFormat::Dxt1 | SurfaceFormat::Dxt3 | SurfaceFormat::Dxt5 => {
            decode_blocks(format, w, h, data)
        }
        _ => None,
    }
}

fn map_texels<const N: usize>(
    data: &[u8],
    texels: usize,
    f: impl Fn([u8; N]) -> [u8; 4],
) -> Option<Vec<u8>> {
    let data = data.get(..texels.checked_mul(N)?)?;
    let mut out = Vec::with_capacity(texels * 4);
    for chunk in data.chunks_exact(N) {
        let mut t = [0u8; N];
        t.copy_from_slice(chunk);
        out.extend_from_slice(&f(t));
    }
    Some(out)
}

fn expand5(v: u8) -> u8 {
    let v = v & 0x1F;
    (v << 3) | (v >> 2)
}

fn expand6(v: u8) -> u8 {
    let v = v & 0x3F;
    (v << 2) | (v >> 4)
}

/// Map a signed normalized byte (-127..=127) to 0..=255.
fn snorm8(b: u8) -> u8 {
    let v = (b as i8).max(-127) as i32 + 127;
    (v * 255 / 254) as u8
}

fn rgb565(c: u16) -> [u8; 3] {
    [
        expand5((c >> 11) as u8),
        expand6((c >> 5) as u8),
        expand5(c as u8),
    ]
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u32, wb: u32) -> [u8; 4] {
    let total = wa + wb;
    let ch = |i: usize| ((a[i] as u32 * wa + b[i] as u32 * wb) / total) as u8;
    [ch(0), ch(1), ch(2), 0xFF]
}

/// Decode the 8-byte color half of a BC1/2/3 block into 16 texels.
///
/// `punch_through` enables the BC1 three-color mode with transparent black.
fn color_block(block: &[u8], punch_through: bool) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let (p0, p1) = (rgb565(c0), rgb565(c1));
    let palette = if c0 > c1 || !punch_through {
        [
            [p0[0], p0[1], p0[2], 0xFF],
            [p1[0], p1[1], p1[2], 0xFF],
            mix(p0, p1, 2, 1),
            mix(p0, p1, 1, 2),
        ]
    } else {
        [
            [p0[0], p0[1], p0[2], 0xFF],
            [p1[0], p1[1], p1[2], 0xFF],
            mix(p0, p1, 1, 1),
            [0, 0, 0, 0],
        ]
    };
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    std::array::from_fn(|i| palette[((indices >> (2 * i)) & 3) as usize])
}

fn explicit_alpha(block: &[u8], texels: &mut [[u8; 4]; 16]) {
    let mut bits = [0u8; 8];
    bits.copy_from_slice(&block[..8]);
    let bits = u64::from_le_bytes(bits);
    for (i, t) in texels.iter_mut().enumerate() {
        t[3] = ((bits >> (4 * i)) & 0xF) as u8 * 17;
    }
}

fn interpolated_alpha(block: &[u8], texels: &mut [[u8; 4]; 16]) {
    let (a0, a1) = (block[0] as u32, block[1] as u32);
    let mut palette = [a0 as u8, a1 as u8, 0, 0, 0, 0, 0, 0];
    if a0 > a1 {
        for k in 1..7 {
            palette[k + 1] = (((7 - k as u32) * a0 + k as u32 * a1) / 7) as u8;
        }
    } else {
        for k in 1..5 {
            palette[k + 1] = (((5 - k as u32) * a0 + k as u32 * a1) / 5) as u8;
        }
        palette[6] = 0;
        palette[7] = 0xFF;
    }
    let mut bits = [0u8; 8];
    bits[..6].copy_from_slice(&block[2..8]);
    let bits = u64::from_le_bytes(bits);
    for (i, t) in texels.iter_mut().enumerate() {
        t[3] = palette[((bits >> (3 * i)) & 7) as usize];
    }
}

fn decode_blocks(format: SurfaceFormat, w: usize, h: usize, data: &[u8]) -> Option<Vec<u8>> {
    let block_size = if format == SurfaceFormat::Dxt1 { 8 } else { 16 };
    let (bw, bh) = (w.div_ceil(4), h.div_ceil(4));
    let data = data.get(..bw.checked_mul(bh)?.checked_mul(block_size)?)?;
    let mut out = vec![0u8; w * h * 4];

    for (b, block) in data.chunks_exact(block_size).enumerate() {
        let texels = match format {
            SurfaceFormat::Dxt1 => color_block(block, true),
            SurfaceFormat::Dxt3 => {
                let mut t = color_block(&block[8..], false);
                explicit_alpha(block, &mut t);
                t
            }
            _ => {
                let mut t = color_block(&block[8..], false);
                interpolated_alpha(block, &mut t);
                t
            }
        };
        let (bx, by) = (b % bw * 4, b / bw * 4);
        for (i, texel) in texels.iter().enumerate() {
            let (x, y) = (bx + i % 4, by + i / 4);
            if x < w && y < h {
                let at = (y * w + x) * 4;
                out[at..at + 4].copy_from_slice(texel);
            }
        }
    }
    Some(out)
}
