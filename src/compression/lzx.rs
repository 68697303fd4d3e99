//! LZX decompression as used by XNA Game Studio content files.
//!
//! XNB payloads with flag `0x80` are compressed with LZX using a 64 KiB
//! window. The compressed data is split into frames; each frame normally
//! expands to 0x8000 bytes and is preceded by a small big-endian header:
//!
//! ```text
//! default frame:  [block_size: u16 BE]
//! short frame:    [0xFF] [frame_size: u16 BE] [block_size: u16 BE]
//! ```
//!
//! The LZX decoder state (sliding window, repeated-offset queue and the
//! previous block's code lengths) persists across frames, but the bitstream
//! restarts at every frame boundary.
//!
//! Inside a frame the data is a regular LZX bitstream: 16-bit little-endian
//! words consumed most-significant bit first, carrying verbatim, aligned
//! offset or uncompressed blocks.
//!
//! [`compress`] produces the same framing with verbatim blocks, so files can
//! be rebuilt and the decoder exercised without external tooling.

use log::trace;

use crate::cursor::ByteCursor;
use crate::{Error, Result};

/// log2 of the sliding window used by XNB content.
pub const WINDOW_BITS: u32 = 16;
const WINDOW_SIZE: usize = 1 << WINDOW_BITS;
/// Uncompressed size of a full frame.
pub const FRAME_SIZE: usize = 0x8000;

const MIN_MATCH: usize = 2;
const MAX_MATCH: usize = 257;
const NUM_CHARS: usize = 256;
const NUM_PRIMARY_LENGTHS: usize = 7;
const NUM_SECONDARY_LENGTHS: usize = 249;

const PRETREE_SYMBOLS: usize = 20;
const PRETREE_BITS: u32 = 6;
const MAINTREE_SYMBOLS: usize = NUM_CHARS + 50 * 8;
const MAINTREE_BITS: u32 = 12;
const LENGTH_SYMBOLS: usize = NUM_SECONDARY_LENGTHS + 1;
const LENGTH_BITS: u32 = 12;
const ALIGNED_SYMBOLS: usize = 8;
const ALIGNED_BITS: u32 = 7;

/// Position slots for a 2^16 window.
const POSITION_SLOTS: usize = 32;
const MAIN_ELEMENTS: usize = NUM_CHARS + (POSITION_SLOTS << 3);

const EXTRA_BITS: [u8; 52] = extra_bits();
const POSITION_BASE: [u32; 52] = position_base();

const fn extra_bits() -> [u8; 52] {
    let mut t = [0u8; 52];
    let mut i = 0;
    let mut j = 0;
    while i < 52 {
        t[i] = j;
        t[i + 1] = j;
        if i != 0 && j < 17 {
            j += 1;
        }
        i += 2;
    }
    t
}

const fn position_base() -> [u32; 52] {
    let extra = extra_bits();
    let mut t = [0u32; 52];
    let mut i = 0;
    let mut j = 0u32;
    while i < 52 {
        t[i] = j;
        j += 1 << extra[i];
        i += 1;
    }
    t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    None,
    Verbatim,
    Aligned,
    Uncompressed,
}

/// MSB-first reader over 16-bit little-endian words.
///
/// Reading past the end of the frame yields zero bits; the decoder checks
/// for overrun at block boundaries.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    buffer: u32,
    bits_left: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            pos: 0,
            base,
            buffer: 0,
            bits_left: 0,
        }
    }

    fn reset(&mut self) {
        self.buffer = 0;
        self.bits_left = 0;
    }

    fn next_byte(&mut self) -> u32 {
        let b = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        b as u32
    }

    fn ensure(&mut self, n: u32) {
        while self.bits_left < n {
            let lo = self.next_byte();
            let hi = self.next_byte();
            self.buffer |= ((hi << 8) | lo) << (16 - self.bits_left);
            self.bits_left += 16;
        }
    }

    fn peek(&self, n: u32) -> u32 {
        self.buffer >> (32 - n)
    }

    fn remove(&mut self, n: u32) {
        self.buffer <<= n;
        self.bits_left -= n;
    }

    fn read(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.ensure(n);
        let v = self.peek(n);
        self.remove(n);
        v
    }

    /// Read raw bytes, bypassing the bit buffer.
    fn raw_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let slice = self.data.get(self.pos..end).ok_or(Error::TruncatedInput {
            offset: self.base + self.pos,
            need: n,
            have: self.data.len().saturating_sub(self.pos),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn raw_u32(&mut self) -> Result<u32> {
        let b = self.raw_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn corrupt(&self, reason: &'static str) -> Error {
        Error::CompressedStream {
            offset: self.base + self.pos.min(self.data.len()),
            reason,
        }
    }
}

/// Canonical Huffman decoding table.
///
/// Codes up to `bits` long resolve with one lookup; longer codes walk a
/// binary tree stored after the direct-lookup area.
struct HuffTable {
    lens: Vec<u8>,
    table: Vec<u16>,
    bits: u32,
}

impl HuffTable {
    fn new(symbols: usize, bits: u32) -> Self {
        Self {
            lens: vec![0; symbols],
            table: vec![0; (1 << bits) + (symbols << 1)],
            bits,
        }
    }

    fn symbols(&self) -> usize {
        self.lens.len()
    }

    /// Rebuild the table from `lens`. Fails if the lengths do not describe a
    /// complete prefix code (an all-zero table is accepted).
    fn build(&mut self) -> std::result::Result<(), ()> {
        let nbits = self.bits;
        let nsyms = self.symbols();
        let mut pos: u32 = 0;
        let mut table_mask: u32 = 1 << nbits;
        let mut bit_mask: u32 = table_mask >> 1;
        let mut next_symbol: u32 = bit_mask;
        let mut bit_num: u32 = 1;

        while bit_num <= nbits {
            for sym in 0..nsyms {
                if self.lens[sym] as u32 != bit_num {
                    continue;
                }
                let leaf = pos as usize;
                pos += bit_mask;
                if pos > table_mask {
                    return Err(());
                }
                self.table[leaf..leaf + bit_mask as usize].fill(sym as u16);
            }
            bit_mask >>= 1;
            bit_num += 1;
        }

        if pos != table_mask {
            self.table[pos as usize..table_mask as usize].fill(0);

            pos <<= 16;
            table_mask <<= 16;
            bit_mask = 1 << 15;

            while bit_num <= 16 {
                for sym in 0..nsyms {
                    if self.lens[sym] as u32 != bit_num {
                        continue;
                    }
                    let mut leaf = (pos >> 16) as usize;
                    for fill in 0..bit_num - nbits {
                        if self.table[leaf] == 0 {
                            let node = (next_symbol << 1) as usize;
                            if node + 1 >= self.table.len() {
                                return Err(());
                            }
                            self.table[node] = 0;
                            self.table[node + 1] = 0;
                            self.table[leaf] = next_symbol as u16;
                            next_symbol += 1;
                        }
                        leaf = (self.table[leaf] as usize) << 1;
                        if (pos >> (15 - fill)) & 1 == 1 {
                            leaf += 1;
                        }
                    }
                    self.table[leaf] = sym as u16;
                    pos += bit_mask;
                    if pos > table_mask {
                        return Err(());
                    }
                }
                bit_mask >>= 1;
                bit_num += 1;
            }
        }

        if pos == table_mask || self.lens.iter().all(|&l| l == 0) {
            Ok(())
        } else {
            Err(())
        }
    }

    fn decode(&self, bits: &mut BitReader<'_>) -> Result<usize> {
        bits.ensure(16);
        let nsyms = self.symbols();
        let mut i = self.table[bits.peek(self.bits) as usize] as usize;
        if i >= nsyms {
            let mut j: u32 = 1 << (32 - self.bits);
            loop {
                j >>= 1;
                if j == 0 {
                    return Err(bits.corrupt("Huffman code longer than 16 bits"));
                }
                i <<= 1;
                if bits.buffer & j != 0 {
                    i |= 1;
                }
                i = *self
                    .table
                    .get(i)
                    .ok_or_else(|| bits.corrupt("Huffman tree index out of range"))?
                    as usize;
                if i < nsyms {
                    break;
                }
            }
        }
        bits.remove(self.lens[i] as u32);
        Ok(i)
    }
}

/// Read a pretree followed by delta-coded lengths for `lens[first..last]`.
fn read_lengths(
    pretree: &mut HuffTable,
    lens: &mut [u8],
    first: usize,
    last: usize,
    bits: &mut BitReader<'_>,
) -> Result<()> {
    for x in 0..PRETREE_SYMBOLS {
        pretree.lens[x] = bits.read(4) as u8;
    }
    pretree
        .build()
        .map_err(|_| bits.corrupt("invalid pretree"))?;

    let delta = |prev: u8, z: usize, bits: &BitReader<'_>| -> Result<u8> {
        if z > 16 {
            return Err(bits.corrupt("invalid pretree symbol"));
        }
        Ok(((prev as usize + 17 - z) % 17) as u8)
    };

    let mut x = first;
    while x < last {
        let z = pretree.decode(bits)?;
        let (value, run) = match z {
            17 => (0, bits.read(4) as usize + 4),
            18 => (0, bits.read(5) as usize + 20),
            19 => {
                let run = bits.read(1) as usize + 4;
                let z = pretree.decode(bits)?;
                (delta(lens[x], z, bits)?, run)
            }
            _ => (delta(lens[x], z, bits)?, 1),
        };
        if x + run > lens.len() {
            return Err(bits.corrupt("code length run overflows table"));
        }
        lens[x..x + run].fill(value);
        x += run;
    }
    Ok(())
}

/// Stateful LZX decoder for one XNB payload.
pub struct LzxDecoder {
    window: Vec<u8>,
    window_pos: usize,
    r: [u32; 3],
    header_read: bool,
    intel_file_size: u32,
    block_type: BlockType,
    block_length: usize,
    block_remaining: usize,
    pretree: HuffTable,
    main: HuffTable,
    length: HuffTable,
    aligned: HuffTable,
}

impl Default for LzxDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LzxDecoder {
    pub fn new() -> Self {
        Self {
            window: vec![0; WINDOW_SIZE],
            window_pos: 0,
            r: [1, 1, 1],
            header_read: false,
            intel_file_size: 0,
            block_type: BlockType::None,
            block_length: 0,
            block_remaining: 0,
            pretree: HuffTable::new(PRETREE_SYMBOLS, PRETREE_BITS),
            main: HuffTable::new(MAINTREE_SYMBOLS, MAINTREE_BITS),
            length: HuffTable::new(LENGTH_SYMBOLS, LENGTH_BITS),
            aligned: HuffTable::new(ALIGNED_SYMBOLS, ALIGNED_BITS),
        }
    }

    /// Decode one frame of `input` producing exactly `out_len` bytes,
    /// appended to `out`. `base` is the frame's offset in the compressed
    /// data, used for error reporting.
    pub fn decompress_frame(
        &mut self,
        input: &[u8],
        out_len: usize,
        base: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let mut bits = BitReader::new(input, base);

        if !self.header_read {
            if bits.read(1) != 0 {
                let hi = bits.read(16);
                let lo = bits.read(16);
                self.intel_file_size = (hi << 16) | lo;
                trace!("lzx: E8 translation header, file size {}", self.intel_file_size);
            }
            self.header_read = true;
        }

        let mut togo = out_len as isize;
        while togo > 0 {
            if self.block_remaining == 0 {
                self.read_block_header(&mut bits)?;
            }

            if bits.pos > input.len() && (bits.pos > input.len() + 2 || bits.bits_left < 16) {
                return Err(bits.corrupt("bitstream overrun"));
            }

            while self.block_remaining > 0 && togo > 0 {
                let mut this_run = (self.block_remaining as isize).min(togo);
                togo -= this_run;
                self.block_remaining -= this_run as usize;

                self.window_pos &= WINDOW_SIZE - 1;
                if self.window_pos + this_run as usize > WINDOW_SIZE {
                    return Err(bits.corrupt("run straddles window wraparound"));
                }

                match self.block_type {
                    BlockType::Verbatim => self.decode_run(&mut bits, &mut this_run, false)?,
                    BlockType::Aligned => self.decode_run(&mut bits, &mut this_run, true)?,
                    BlockType::Uncompressed => {
                        let n = this_run as usize;
                        let src = bits.raw_bytes(n)?;
                        self.window[self.window_pos..self.window_pos + n].copy_from_slice(src);
                        self.window_pos += n;
                        this_run = 0;
                    }
                    BlockType::None => return Err(bits.corrupt("no block header")),
                }

                // A match may run past the end of the current run.
                if this_run < 0 {
                    let over = (-this_run) as usize;
                    if over > self.block_remaining {
                        return Err(bits.corrupt("match overruns block"));
                    }
                    self.block_remaining -= over;
                }
            }
        }

        if togo != 0 {
            return Err(bits.corrupt("frame produced more data than requested"));
        }

        let end = if self.window_pos == 0 {
            WINDOW_SIZE
        } else {
            self.window_pos
        };
        let start = end
            .checked_sub(out_len)
            .ok_or_else(|| bits.corrupt("frame larger than window position"))?;
        out.extend_from_slice(&self.window[start..end]);
        Ok(())
    }

    fn read_block_header(&mut self, bits: &mut BitReader<'_>) -> Result<()> {
        if self.block_type == BlockType::Uncompressed {
            // Uncompressed blocks are padded to an even length.
            if self.block_length & 1 == 1 {
                bits.pos += 1;
            }
            bits.reset();
        }

        let ty = bits.read(3);
        let hi = bits.read(16);
        let lo = bits.read(8);
        self.block_length = ((hi << 8) | lo) as usize;
        self.block_remaining = self.block_length;

        self.block_type = match ty {
            1 => BlockType::Verbatim,
            2 => BlockType::Aligned,
            3 => BlockType::Uncompressed,
            _ => return Err(bits.corrupt("invalid block type")),
        };
        trace!(
            "lzx: {:?} block, {} bytes",
            self.block_type, self.block_length
        );

        match self.block_type {
            BlockType::Aligned => {
                for i in 0..ALIGNED_SYMBOLS {
                    self.aligned.lens[i] = bits.read(3) as u8;
                }
                self.aligned
                    .build()
                    .map_err(|_| bits.corrupt("invalid aligned offset tree"))?;
                self.read_main_and_length_trees(bits)?;
            }
            BlockType::Verbatim => self.read_main_and_length_trees(bits)?,
            BlockType::Uncompressed => {
                bits.ensure(16);
                if bits.bits_left > 16 {
                    bits.pos -= 2;
                }
                for i in 0..3 {
                    self.r[i] = bits.raw_u32()?;
                }
            }
            BlockType::None => unreachable!(),
        }
        Ok(())
    }

    fn read_main_and_length_trees(&mut self, bits: &mut BitReader<'_>) -> Result<()> {
        read_lengths(&mut self.pretree, &mut self.main.lens, 0, NUM_CHARS, bits)?;
        read_lengths(
            &mut self.pretree,
            &mut self.main.lens,
            NUM_CHARS,
            MAIN_ELEMENTS,
            bits,
        )?;
        self.main
            .build()
            .map_err(|_| bits.corrupt("invalid main tree"))?;

        read_lengths(
            &mut self.pretree,
            &mut self.length.lens,
            0,
            NUM_SECONDARY_LENGTHS,
            bits,
        )?;
        self.length
            .build()
            .map_err(|_| bits.corrupt("invalid length tree"))
    }

    /// Decode literals and matches for a verbatim or aligned block until
    /// `this_run` bytes have been produced (or overshot by a final match).
    fn decode_run(
        &mut self,
        bits: &mut BitReader<'_>,
        this_run: &mut isize,
        aligned: bool,
    ) -> Result<()> {
        while *this_run > 0 {
            let main_element = self.main.decode(bits)?;
            if main_element < NUM_CHARS {
                self.window[self.window_pos] = main_element as u8;
                self.window_pos += 1;
                *this_run -= 1;
                continue;
            }

            let element = main_element - NUM_CHARS;
            let mut match_length = element & NUM_PRIMARY_LENGTHS;
            if match_length == NUM_PRIMARY_LENGTHS {
                match_length += self.length.decode(bits)?;
            }
            match_length += MIN_MATCH;

            let slot = element >> 3;
            let match_offset: u32 = match slot {
                0 => self.r[0],
                1 => {
                    self.r.swap(0, 1);
                    self.r[0]
                }
                2 => {
                    self.r.swap(0, 2);
                    self.r[0]
                }
                _ => {
                    let offset = self.explicit_offset(bits, slot, aligned)?;
                    self.r = [offset, self.r[0], self.r[1]];
                    offset
                }
            };
            let match_offset = match_offset as usize;

            if match_offset == 0 || match_offset > WINDOW_SIZE {
                return Err(bits.corrupt("match offset outside window"));
            }
            if self.window_pos + match_length > WINDOW_SIZE {
                return Err(bits.corrupt("match runs past end of window"));
            }

            *this_run -= match_length as isize;
            self.copy_match(match_offset, match_length);
        }
        Ok(())
    }

    fn explicit_offset(&self, bits: &mut BitReader<'_>, slot: usize, aligned: bool) -> Result<u32> {
        let extra = EXTRA_BITS[slot] as u32;
        if !aligned {
            if slot == 3 {
                return Ok(1);
            }
            return Ok(POSITION_BASE[slot] - 2 + bits.read(extra));
        }

        let mut offset = POSITION_BASE[slot] - 2;
        if extra > 3 {
            offset += bits.read(extra - 3) << 3;
            offset += self.aligned.decode(bits)? as u32;
        } else if extra == 3 {
            offset += self.aligned.decode(bits)? as u32;
        } else if extra > 0 {
            offset += bits.read(extra);
        } else {
            offset = 1;
        }
        Ok(offset)
    }

    /// Copy `len` bytes from `offset` bytes back, wrapping the source around
    /// the start of the window.
    fn copy_match(&mut self, offset: usize, mut len: usize) {
        let mut dest = self.window_pos;
        let mut src;
        if self.window_pos >= offset {
            src = dest - offset;
        } else {
            src = dest + WINDOW_SIZE - offset;
            let wrapped = offset - self.window_pos;
            if wrapped < len {
                len -= wrapped;
                self.window_pos += wrapped;
                for _ in 0..wrapped {
                    self.window[dest] = self.window[src];
                    dest += 1;
                    src += 1;
                }
                src = 0;
            }
        }
        self.window_pos += len;
        // Byte-wise: source and destination may overlap.
        for _ in 0..len {
            self.window[dest] = self.window[src];
            dest += 1;
            src += 1;
        }
    }
}

/// Decompress an XNB LZX payload, which must expand to exactly
/// `decompressed_size` bytes.
pub fn decompress(input: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut decoder = LzxDecoder::new();
    // The declared size is untrusted; reserve in proportion to the input and
    // let later frames grow the buffer.
    let reserve = input.len().saturating_mul(4).max(FRAME_SIZE);
    let mut out = Vec::with_capacity(decompressed_size.min(reserve));
    let mut c = ByteCursor::new(input);

    while !c.is_empty() {
        let hi = c.read_u8()?;
        let (frame_size, block_size) = if hi == 0xFF {
            let frame = u16::from_be_bytes(c.read_array()?);
            let block = u16::from_be_bytes(c.read_array()?);
            (frame as usize, block as usize)
        } else {
            let lo = c.read_u8()?;
            (FRAME_SIZE, ((hi as usize) << 8) | lo as usize)
        };
        if frame_size == 0 || block_size == 0 {
            break;
        }

        let base = c.position();
        let block = c.read_bytes(block_size)?;
        trace!("lzx: frame at {base:#x}, {block_size} -> {frame_size} bytes");
        decoder.decompress_frame(block, frame_size, base, &mut out)?;

        if out.len() > decompressed_size {
            break;
        }
    }

    if out.len() != decompressed_size {
        return Err(Error::CorruptCompression {
            expected: decompressed_size,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Assign canonical Huffman codes (shorter codes first, ties broken by
/// symbol order) matching [`HuffTable::build`].
fn canonical_codes(lens: &[u8]) -> Vec<u32> {
    let mut codes = vec![0; lens.len()];
    let mut code = 0u32;
    for len in 1..=16u8 {
        for (sym, &l) in lens.iter().enumerate() {
            if l == len {
                codes[sym] = code;
                code += 1;
            }
        }
        code <<= 1;
    }
    codes
}

/// MSB-first writer producing 16-bit little-endian words.
struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    n: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            n: 0,
        }
    }

    fn write(&mut self, value: u32, bits: u32) {
        if bits == 0 {
            return;
        }
        self.acc = (self.acc << bits) | (value as u64 & ((1u64 << bits) - 1));
        self.n += bits;
        while self.n >= 16 {
            let word = (self.acc >> (self.n - 16)) as u16;
            self.out.extend_from_slice(&word.to_le_bytes());
            self.n -= 16;
        }
        self.acc &= (1u64 << self.n) - 1;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.n > 0 {
            self.write(0, 16 - self.n);
        }
        self.out
    }
}

/// Fixed code lengths used by the encoder. Every block carries the same
/// trees, so only the first frame pays for non-zero deltas.
struct EncoderTrees {
    pretree_lens: [u8; PRETREE_SYMBOLS],
    pretree_codes: Vec<u32>,
    main_lens: Vec<u8>,
    main_codes: Vec<u32>,
    length_lens: Vec<u8>,
    length_codes: Vec<u32>,
}

impl EncoderTrees {
    fn new() -> Self {
        let mut pretree_lens = [0u8; PRETREE_SYMBOLS];
        pretree_lens[..15].fill(4);
        pretree_lens[15..17].fill(5);

        let main_lens = vec![9u8; MAIN_ELEMENTS];

        let mut length_lens = vec![8u8; NUM_SECONDARY_LENGTHS];
        length_lens[..7].fill(7);

        Self {
            pretree_codes: canonical_codes(&pretree_lens),
            pretree_lens,
            main_codes: canonical_codes(&main_lens),
            main_lens,
            length_codes: canonical_codes(&length_lens),
            length_lens,
        }
    }

    fn write_lengths(&self, w: &mut BitWriter, lens: &[u8], prev: &mut [u8]) {
        for &l in &self.pretree_lens {
            w.write(l as u32, 4);
        }
        for (new, old) in lens.iter().zip(prev.iter_mut()) {
            let z = (*old as usize + 17 - *new as usize) % 17;
            w.write(self.pretree_codes[z], self.pretree_lens[z] as u32);
            *old = *new;
        }
    }

    fn literal(&self, w: &mut BitWriter, b: u8) {
        w.write(self.main_codes[b as usize], self.main_lens[b as usize] as u32);
    }

    fn matched(&self, w: &mut BitWriter, len: usize, distance: usize) {
        let formatted = distance as u32 + 2;
        let slot = (3..POSITION_SLOTS)
            .rev()
            .find(|&s| POSITION_BASE[s] <= formatted)
            .unwrap_or(3);
        let header = (len - MIN_MATCH).min(NUM_PRIMARY_LENGTHS);
        let sym = NUM_CHARS + ((slot << 3) | header);
        w.write(self.main_codes[sym], self.main_lens[sym] as u32);
        if header == NUM_PRIMARY_LENGTHS {
            let footer = len - MIN_MATCH - NUM_PRIMARY_LENGTHS;
            w.write(self.length_codes[footer], self.length_lens[footer] as u32);
        }
        if slot != 3 {
            w.write(formatted - POSITION_BASE[slot], EXTRA_BITS[slot] as u32);
        }
    }
}

const HASH_BITS: u32 = 15;
const MAX_DISTANCE: usize = FRAME_SIZE;

fn hash3(b: &[u8]) -> usize {
    let v = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
    (v.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS)) as usize
}

/// Compress `data` into XNB-framed LZX.
///
/// Each frame holds one verbatim block with fixed code lengths; matches are
/// found greedily with a single-entry hash table. The output is not as small
/// as the content pipeline's but decodes with any conforming LZX decoder.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let trees = EncoderTrees::new();
    let mut prev_main = vec![0u8; MAIN_ELEMENTS];
    let mut prev_length = vec![0u8; NUM_SECONDARY_LENGTHS];
    let mut head = vec![usize::MAX; 1 << HASH_BITS];
    let mut out = Vec::with_capacity(data.len() / 2 + 16);

    for (index, frame) in data.chunks(FRAME_SIZE).enumerate() {
        let frame_start = index * FRAME_SIZE;
        let frame_end = frame_start + frame.len();
        let mut w = BitWriter::new();

        if index == 0 {
            // No E8 translation.
            w.write(0, 1);
        }
        w.write(1, 3);
        w.write((frame.len() >> 8) as u32, 16);
        w.write((frame.len() & 0xFF) as u32, 8);
        trees.write_lengths(&mut w, &trees.main_lens[..NUM_CHARS], &mut prev_main[..NUM_CHARS]);
        trees.write_lengths(&mut w, &trees.main_lens[NUM_CHARS..], &mut prev_main[NUM_CHARS..]);
        trees.write_lengths(&mut w, &trees.length_lens, &mut prev_length);

        let mut pos = frame_start;
        while pos < frame_end {
            if frame_end - pos >= 3 {
                let h = hash3(&data[pos..]);
                let candidate = head[h];
                head[h] = pos;
                if candidate != usize::MAX && pos - candidate <= MAX_DISTANCE {
                    let limit = (frame_end - pos).min(MAX_MATCH);
                    let best = data[candidate..]
                        .iter()
                        .zip(&data[pos..pos + limit])
                        .take_while(|(a, b)| a == b)
                        .count();
                    if best >= 3 {
                        trees.matched(&mut w, best, pos - candidate);
                        for p in pos + 1..pos + best {
                            if frame_end - p >= 3 {
                                head[hash3(&data[p..])] = p;
                            }
                        }
                        pos += best;
                        continue;
                    }
                }
            }
            trees.literal(&mut w, data[pos]);
            pos += 1;
        }

        let block = w.finish();
        if frame.len() == FRAME_SIZE {
            out.extend_from_slice(&(block.len() as u16).to_be_bytes());
        } else {
            out.push(0xFF);
            out.extend_from_slice(&(frame.len() as u16).to_be_bytes());
            out.extend_from_slice(&(block.len() as u16).to_be_bytes());
        }
        out.extend_from_slice(&block);
    }
    out
}
