//! Extended Golay(24,12) inner code.
//!
//! Built from the classic [23,12,7] cyclic Golay code (generator
//! polynomial octal 5343) extended with an overall parity bit, giving
//! minimum distance 8. Decoding uses a syndrome table over all error
//! patterns of weight three or less; every such pattern has a distinct
//! syndrome, so the decoder corrects any three bit errors per codeword.
//! Heavier error patterns miss the table and pass through uncorrected,
//! which the packet CRC then catches.

/// Generator polynomial of the [23,12] Golay code: x^11 + x^9 + x^7 +
/// x^6 + x^5 + x + 1
const GEN_POLY: u32 = 0xAE3;

const DATA_BITS: usize = 12;
const CODE_BITS: usize = 24;
const SYNDROMES: usize = 1 << DATA_BITS;
const NO_ENTRY: u32 = u32::MAX;

/// Remainder of a 23-bit polynomial modulo the generator.
fn cyclic_rem(mut poly: u32) -> u32 {
    for i in (11..23).rev() {
        if poly & (1 << i) != 0 {
            poly ^= GEN_POLY << (i - 11);
        }
    }
    poly
}

/// 12-bit syndrome of a 24-bit word: 11 cyclic-remainder bits plus the
/// overall-parity bit in the LSB.
fn syndrome(word: u32) -> u32 {
    (cyclic_rem(word >> 1) << 1) | (word.count_ones() & 1)
}

/// Golay(24,12) encoder/decoder with a precomputed correction table.
pub struct GolayCodec {
    table: Vec<u32>,
}

impl GolayCodec {
    pub fn new() -> Self {
        let mut table = vec![NO_ENTRY; SYNDROMES];

        let mut insert = |error: u32, table: &mut Vec<u32>| {
            let s = syndrome(error) as usize;
            debug_assert_eq!(table[s], NO_ENTRY, "syndrome collision");
            table[s] = error;
        };

        insert(0, &mut table);
        for a in 0..CODE_BITS {
            insert(1 << a, &mut table);
            for b in 0..a {
                insert((1 << a) | (1 << b), &mut table);
                for c in 0..b {
                    insert((1 << a) | (1 << b) | (1 << c), &mut table);
                }
            }
        }

        Self { table }
    }

    /// Encode 12 data bits into a 24-bit codeword:
    /// `[data(12) | parity(11) | extension(1)]`.
    pub fn encode(&self, data: u16) -> u32 {
        let m = u32::from(data) & 0xFFF;
        let parity = cyclic_rem(m << 11);
        let c23 = (m << 11) | parity;
        let ext = c23.count_ones() & 1;
        (c23 << 1) | ext
    }

    /// Decode a 24-bit received word, correcting up to three bit errors.
    /// Returns the 12 data bits; uncorrectable words are returned as-is.
    pub fn decode(&self, word: u32) -> u16 {
        let word = word & 0xFF_FFFF;
        let s = syndrome(word) as usize;
        let corrected = match self.table[s] {
            NO_ENTRY => word,
            error => word ^ error,
        };
        (corrected >> 12) as u16
    }
}

impl Default for GolayCodec {
    fn default() -> Self {
        Self::new()
    }
}
