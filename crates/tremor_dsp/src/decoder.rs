//! Accelerometer Payload Decoder
//!
//! Sensor payloads are a flat run of 6-byte blocks. Each block holds one
//! sample per axis as a little-endian signed 16-bit integer:
//!
//! ```text
//! offset  0      2      4      6      8     10     12
//!         ├──x───┼──y───┼──z───┼──x───┼──y───┼──z───┤ ...
//! ```
//!
//! A trailing partial block is ignored. Decoding never fails: a short or
//! empty payload simply yields fewer (or zero) samples.

/// Size of one encoded (x, y, z) sample in bytes
pub const BLOCK_SIZE: usize = 6;

/// One decoded accelerometer sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleTriplet {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl SampleTriplet {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decode one block. Caller guarantees `block` is exactly [`BLOCK_SIZE`] bytes.
    #[inline]
    fn from_block(block: &[u8]) -> Self {
        Self {
            x: i16::from_le_bytes([block[0], block[1]]),
            y: i16::from_le_bytes([block[2], block[3]]),
            z: i16::from_le_bytes([block[4], block[5]]),
        }
    }

    /// Encode back into the on-wire block layout
    pub fn to_le_bytes(self) -> [u8; BLOCK_SIZE] {
        let [x0, x1] = self.x.to_le_bytes();
        let [y0, y1] = self.y.to_le_bytes();
        let [z0, z1] = self.z.to_le_bytes();
        [x0, x1, y0, y1, z0, z1]
    }
}

/// The three per-axis series decoded from one payload
///
/// Fields are private so the three series can only be built together and
/// always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSeries {
    x: Vec<i16>,
    y: Vec<i16>,
    z: Vec<i16>,
}

impl AxisSeries {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, sample: SampleTriplet) {
        self.x.push(sample.x);
        self.y.push(sample.y);
        self.z.push(sample.z);
    }

    pub fn x(&self) -> &[i16] {
        &self.x
    }

    pub fn y(&self) -> &[i16] {
        &self.y
    }

    pub fn z(&self) -> &[i16] {
        &self.z
    }

    /// Number of samples per axis
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Consume into `(x, y, z)` vectors
    pub fn into_parts(self) -> (Vec<i16>, Vec<i16>, Vec<i16>) {
        (self.x, self.y, self.z)
    }
}

impl FromIterator<SampleTriplet> for AxisSeries {
    fn from_iter<I: IntoIterator<Item = SampleTriplet>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut series = Self::with_capacity(iter.size_hint().0);
        for sample in iter {
            series.push(sample);
        }
        series
    }
}

/// Iterate over the complete blocks of a payload
pub fn triplets(payload: &[u8]) -> impl ExactSizeIterator<Item = SampleTriplet> + '_ {
    payload.chunks_exact(BLOCK_SIZE).map(SampleTriplet::from_block)
}

/// Decode every complete block into a triplet
pub fn decode_triplets(payload: &[u8]) -> Vec<SampleTriplet> {
    triplets(payload).collect()
}

/// Decode a payload into its three axis series
pub fn decode_payload(payload: &[u8]) -> AxisSeries {
    triplets(payload).collect()
}

/// Inverse of [`decode_triplets`]
pub fn encode_triplets(samples: &[SampleTriplet]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
