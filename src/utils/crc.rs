/// CRC32 implementation specifically for MPEG-2 TS PSI tables
/// Based on ITU-T H.222.0 / ISO/IEC 13818-1
/// Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1
/// Initial value: 0xFFFFFFFF, no final xor, MSB first
const CRC32_MPEG2: u32 = 0x04C11DB7;

const CRC32_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if (crc & 0x8000_0000) != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// MPEG-2 CRC32 calculator used for Transport Stream PSI table validation
///
/// The lookup table is computed at compile time, so the calculator itself is
/// a zero-sized handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Creates a new CRC32 calculator
    pub fn new() -> Self {
        Self
    }

    /// Calculates the CRC32 checksum for the given data using the MPEG-2 algorithm
    ///
    /// # Examples
    ///
    /// ```
    /// use mp2t::utils::Crc32Mpeg2;
    ///
    /// let crc = Crc32Mpeg2::new();
    /// assert_eq!(crc.calculate(&[0x01, 0x01]), 0xD66FB816);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
            let index = ((crc >> 24) ^ byte as u32) & 0xFF;
            (crc << 8) ^ CRC32_TABLE[index as usize]
        })
    }

    /// Checks a PSI section that ends with its own CRC32 field.
    ///
    /// Running the CRC over the data followed by its big-endian checksum
    /// leaves a zero remainder when the section is intact.
    pub fn is_valid_section(&self, section: &[u8]) -> bool {
        section.len() >= 4 && self.calculate(section) == 0
    }
}
