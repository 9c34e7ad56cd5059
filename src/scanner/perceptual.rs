//! Perceptual image fingerprints for similarity detection.
//!
//! This module provides the [`PerceptualHasher`] which reduces an image to a
//! 64-bit [`Fingerprint`] that stays stable under common non-destructive edits
//! (brightness changes, filters, mild recompression) while differing strongly
//! between unrelated images.
//!
//! # Pipeline
//!
//! 1. Decode (JPEG, PNG, GIF, WebP), flatten alpha, convert to 8-bit RGB
//! 2. Optional preprocessing, in order: gamma correction, per-channel
//!    histogram equalization, 3×3 box blur
//! 3. Catmull-Rom resize to the algorithm's working size
//! 4. Luminance (`0.299 R + 0.587 G + 0.114 B`, truncated)
//! 5. Bit extraction:
//!    - **dHash**: 9×8, bit = left pixel brighter than its right neighbour
//!    - **aHash**: 8×8, bit = pixel ≥ integer mean
//!    - **pHash**: 32×32 DCT, top-left 8×8 block, bit = coefficient ≥ mean
//!      of the 63 AC coefficients (the DC bit uses the same mean)

use std::path::Path;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bits in every fingerprint.
pub const FINGERPRINT_BITS: usize = 64;

/// Gamma exponent used by the brightness normalization step.
pub const GAMMA: f64 = 2.2;

/// File extensions that are fingerprinted in perceptual mode.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const DHASH_WIDTH: u32 = 9;
const DHASH_HEIGHT: u32 = 8;
const AHASH_SIZE: u32 = 8;
const PHASH_SIZE: usize = 32;
const PHASH_BLOCK: usize = 8;

/// Supported perceptual hashing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PerceptualAlgorithm {
    /// dHash (Difference Hash) - Gradient-based, fast, good for near-duplicates.
    #[default]
    Dhash,
    /// aHash (Average Hash) - Mean-based, balanced speed and accuracy.
    Ahash,
    /// pHash (Perceptual Hash) - DCT-based, most robust, slowest.
    Phash,
}

impl PerceptualAlgorithm {
    /// All algorithms, in the order the compare report lists them.
    pub const ALL: [Self; 3] = [Self::Dhash, Self::Ahash, Self::Phash];

    /// Resolve an algorithm name, falling back to dHash for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dhash" | "difference" => Self::Dhash,
            "ahash" | "average" => Self::Ahash,
            "phash" | "perceptual" => Self::Phash,
            other => {
                log::warn!(
                    "Unknown perceptual algorithm {:?}, falling back to dhash",
                    other
                );
                Self::Dhash
            }
        }
    }

    /// Get the default similarity threshold (Hamming distance) for this algorithm.
    ///
    /// pHash bits move more per unit of visual change, so it gets the
    /// tightest threshold.
    #[must_use]
    pub fn default_threshold(&self) -> u32 {
        match self {
            Self::Dhash => 10,
            Self::Ahash => 12,
            Self::Phash => 8,
        }
    }

    /// Lowercase name as accepted by [`PerceptualAlgorithm::from_name`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dhash => "dhash",
            Self::Ahash => "ahash",
            Self::Phash => "phash",
        }
    }

    /// One-line description for reports.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Dhash => "Difference Hash - Fast, good for near-duplicates",
            Self::Ahash => "Average Hash - Balanced speed and accuracy",
            Self::Phash => "Perceptual Hash - Most robust, slower",
        }
    }
}

impl From<String> for PerceptualAlgorithm {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dhash => write!(f, "dHash"),
            Self::Ahash => write!(f, "aHash"),
            Self::Phash => write!(f, "pHash"),
        }
    }
}

/// How aggressively the default threshold is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Strictness {
    /// Fewer matches (×0.6).
    Strict,
    /// Algorithm default (×1.0).
    #[default]
    Normal,
    /// More matches (×1.5).
    Loose,
}

impl Strictness {
    /// Resolve a strictness name, falling back to `Normal`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            "normal" => Self::Normal,
            "loose" => Self::Loose,
            other => {
                log::warn!("Unknown strictness {:?}, using normal", other);
                Self::Normal
            }
        }
    }

    /// Multiplier applied to the algorithm's default threshold.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Strict => 0.6,
            Self::Normal => 1.0,
            Self::Loose => 1.5,
        }
    }
}

impl From<String> for Strictness {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Threshold for `algorithm` scaled by `strictness`, truncated.
#[must_use]
pub fn adaptive_threshold(algorithm: PerceptualAlgorithm, strictness: Strictness) -> u32 {
    (f64::from(algorithm.default_threshold()) * strictness.multiplier()) as u32
}

/// A 64-bit perceptual fingerprint stored as 64 `'0'`/`'1'` characters.
///
/// Bit 0 is the first character. The constructors guarantee the length and
/// alphabet, so two fingerprints can always be compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

/// Rejected fingerprint text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    /// Wrong number of characters.
    #[error("fingerprint must be 64 bits, got {0}")]
    Length(usize),
    /// A character other than `0` or `1`.
    #[error("invalid fingerprint character {0:?}")]
    Character(char),
}

impl Fingerprint {
    /// Build a fingerprint from the 64 bits of `value`, most significant first.
    #[must_use]
    pub fn from_bits(value: u64) -> Self {
        Self(format!("{:064b}", value))
    }

    /// Build a fingerprint from exactly 64 booleans.
    #[must_use]
    pub fn from_bools(bits: &[bool; FINGERPRINT_BITS]) -> Self {
        Self(bits.iter().map(|&b| if b { '1' } else { '0' }).collect())
    }

    /// The bit string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bits packed into a `u64`, first character most significant.
    #[must_use]
    pub fn to_bits(&self) -> u64 {
        self.0
            .bytes()
            .fold(0u64, |acc, b| (acc << 1) | u64::from(b == b'1'))
    }

    /// Hamming distance to another fingerprint.
    #[must_use]
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        crate::duplicates::similarity::hamming_distance(&self.0, &other.0)
            .unwrap_or(FINGERPRINT_BITS as u32)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FINGERPRINT_BITS {
            return Err(FingerprintError::Length(s.chars().count()));
        }
        if let Some(c) = s.chars().find(|c| *c != '0' && *c != '1') {
            return Err(FingerprintError::Character(c));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Toggles for the normalization steps applied before resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessing {
    /// Gamma correction with exponent 2.2 (brightness/contrast edits).
    pub gamma: bool,
    /// Per-channel histogram equalization (saturation/contrast filters).
    pub equalize: bool,
    /// 3×3 box blur on the colour image (sharpening, compression noise).
    pub blur: bool,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self {
            gamma: true,
            equalize: true,
            blur: true,
        }
    }
}

impl Preprocessing {
    /// No preprocessing at all; hash the raw pixels.
    #[must_use]
    pub fn none() -> Self {
        Self {
            gamma: false,
            equalize: false,
            blur: false,
        }
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or read the image file.
    #[error("Failed to read image {path}: {source}")]
    Io {
        /// Path of the image
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode the image.
    #[error("Failed to load image {0}: {1}")]
    Load(String, #[source] image::ImageError),
}

/// Whether `path` has an extension that perceptual mode fingerprints.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Computes perceptual fingerprints for images.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher {
    algorithm: PerceptualAlgorithm,
    preprocessing: Preprocessing,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm and the full
    /// preprocessing pipeline.
    #[must_use]
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        Self {
            algorithm,
            preprocessing: Preprocessing::default(),
        }
    }

    /// Replace the preprocessing toggles.
    #[must_use]
    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// Get the algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }

    /// Get the preprocessing toggles used by this hasher.
    #[must_use]
    pub fn preprocessing(&self) -> Preprocessing {
        self.preprocessing
    }

    /// Decode the image at `path` and fingerprint it.
    ///
    /// The format is sniffed from the content, so a PNG saved as `.jpg`
    /// still decodes.
    ///
    /// # Errors
    ///
    /// Returns `PerceptualError` if the file cannot be read or decoded.
    pub fn fingerprint_file<P: AsRef<Path>>(&self, path: P) -> Result<Fingerprint, PerceptualError> {
        let path = path.as_ref();
        let io_err = |source| PerceptualError::Io {
            path: path.display().to_string(),
            source,
        };

        let img = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|e| PerceptualError::Load(path.display().to_string(), e))?;

        Ok(self.fingerprint_image(&img))
    }

    /// Fingerprint an already decoded image.
    #[must_use]
    pub fn fingerprint_image(&self, img: &DynamicImage) -> Fingerprint {
        self.fingerprint_rgb(flatten_alpha(img))
    }

    /// Fingerprint an 8-bit RGB image.
    #[must_use]
    pub fn fingerprint_rgb(&self, img: RgbImage) -> Fingerprint {
        let processed = preprocess(img, self.preprocessing);
        match self.algorithm {
            PerceptualAlgorithm::Dhash => dhash(&processed),
            PerceptualAlgorithm::Ahash => ahash(&processed),
            PerceptualAlgorithm::Phash => phash(&processed),
        }
    }
}

/// Convert to RGB, premultiplying alpha so transparent areas read as black.
fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let scale = |c: u8| ((u16::from(c) * u16::from(a)) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

/// Run the enabled preprocessing steps in their fixed order.
#[must_use]
pub fn preprocess(mut img: RgbImage, opts: Preprocessing) -> RgbImage {
    if opts.gamma {
        apply_gamma(&mut img, GAMMA);
    }
    if opts.equalize {
        equalize_histogram(&mut img);
    }
    if opts.blur {
        img = box_blur(&img);
    }
    img
}

/// Apply `pow(c / 255, 1 / gamma) * 255` to every channel, truncated.
pub fn apply_gamma(img: &mut RgbImage, gamma: f64) {
    let inv_gamma = 1.0 / gamma;
    let mut table = [0u8; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        *slot = ((value as f64 / 255.0).powf(inv_gamma) * 255.0) as u8;
    }

    for pixel in img.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = table[usize::from(*c)];
        }
    }
}

/// Equalize each of R, G and B independently through its own CDF.
pub fn equalize_histogram(img: &mut RgbImage) {
    let pixel_count = u64::from(img.width()) * u64::from(img.height());
    if pixel_count == 0 {
        return;
    }

    let mut hist = [[0u64; 256]; 3];
    for pixel in img.pixels() {
        for (channel, &c) in pixel.0.iter().enumerate() {
            hist[channel][usize::from(c)] += 1;
        }
    }

    let mut tables = [[0u8; 256]; 3];
    for channel in 0..3 {
        let mut cumulative = 0u64;
        for value in 0..256 {
            cumulative += hist[channel][value];
            tables[channel][value] = ((cumulative as f64 / pixel_count as f64) * 255.0) as u8;
        }
    }

    for pixel in img.pixels_mut() {
        for (channel, c) in pixel.0.iter_mut().enumerate() {
            *c = tables[channel][usize::from(*c)];
        }
    }
}

/// 3×3 box blur; edge pixels average only their in-bounds neighbours.
#[must_use]
pub fn box_blur(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let mut sums = [0u32; 3];
        let mut count = 0u32;

        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let p = img.get_pixel(nx, ny);
                for (sum, &c) in sums.iter_mut().zip(p.0.iter()) {
                    *sum += u32::from(c);
                }
                count += 1;
            }
        }

        Rgb(sums.map(|s| (s / count) as u8))
    })
}

/// Luminance of an RGB pixel, truncated to an integer.
#[must_use]
pub fn luminance(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) as u8
}

/// Catmull-Rom resize, skipped when the image already has the target size.
fn resize(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::CatmullRom)
}

/// Row-major luminance values.
fn luma_grid(img: &RgbImage) -> Vec<u8> {
    img.pixels().map(luminance).collect()
}

fn dhash(img: &RgbImage) -> Fingerprint {
    let small = resize(img, DHASH_WIDTH, DHASH_HEIGHT);
    let luma = luma_grid(&small);
    let width = DHASH_WIDTH as usize;

    let mut bits = [false; FINGERPRINT_BITS];
    for y in 0..DHASH_HEIGHT as usize {
        for x in 0..width - 1 {
            bits[y * (width - 1) + x] = luma[y * width + x] > luma[y * width + x + 1];
        }
    }
    Fingerprint::from_bools(&bits)
}

fn ahash(img: &RgbImage) -> Fingerprint {
    let small = resize(img, AHASH_SIZE, AHASH_SIZE);
    let luma = luma_grid(&small);

    let total: u32 = luma.iter().map(|&l| u32::from(l)).sum();
    let mean = total / FINGERPRINT_BITS as u32;

    let mut bits = [false; FINGERPRINT_BITS];
    for (bit, &l) in bits.iter_mut().zip(luma.iter()) {
        *bit = u32::from(l) >= mean;
    }
    Fingerprint::from_bools(&bits)
}

fn phash(img: &RgbImage) -> Fingerprint {
    let small = resize(img, PHASH_SIZE as u32, PHASH_SIZE as u32);
    let pixels: Vec<f64> = luma_grid(&small).into_iter().map(f64::from).collect();
    let dct = dct_2d(&pixels, PHASH_SIZE);

    let block: Vec<f64> = (0..PHASH_BLOCK)
        .flat_map(|v| (0..PHASH_BLOCK).map(move |u| (v, u)))
        .map(|(v, u)| dct[v * PHASH_SIZE + u])
        .collect();

    // DC at index 0 is left out of the mean but still gets a bit below.
    let ac_sum: f64 = block[1..].iter().sum();
    let mean = ac_sum / (block.len() - 1) as f64;

    let mut bits = [false; FINGERPRINT_BITS];
    for (bit, &coef) in bits.iter_mut().zip(block.iter()) {
        *bit = coef >= mean;
    }
    Fingerprint::from_bools(&bits)
}

/// Two-dimensional DCT-II of an `n`×`n` row-major block.
///
/// Output index `v * n + u` holds vertical frequency `v` and horizontal
/// frequency `u`, scaled by `2/n · c(u) · c(v)` with `c(0) = 1/√2`.
#[must_use]
pub fn dct_2d(pixels: &[f64], n: usize) -> Vec<f64> {
    debug_assert_eq!(pixels.len(), n * n);

    let cosines: Vec<f64> = (0..n)
        .flat_map(|k| {
            (0..n).map(move |i| {
                ((2.0 * i as f64 + 1.0) * k as f64 * std::f64::consts::PI / (2.0 * n as f64)).cos()
            })
        })
        .collect();
    let norm = |k: usize| {
        if k == 0 {
            std::f64::consts::FRAC_1_SQRT_2
        } else {
            1.0
        }
    };

    // Rows first: rows[y * n + u]
    let mut rows = vec![0.0; n * n];
    for y in 0..n {
        for u in 0..n {
            rows[y * n + u] = (0..n)
                .map(|x| pixels[y * n + x] * cosines[u * n + x])
                .sum();
        }
    }

    let scale = 2.0 / n as f64;
    let mut out = vec![0.0; n * n];
    for v in 0..n {
        for u in 0..n {
            let sum: f64 = (0..n).map(|y| rows[y * n + u] * cosines[v * n + y]).sum();
            out[v * n + u] = sum * scale * norm(u) * norm(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, 100])
        })
    }

    #[test]
    fn test_perceptual_algorithms_display() {
        assert_eq!(PerceptualAlgorithm::Phash.to_string(), "pHash");
        assert_eq!(PerceptualAlgorithm::Dhash.to_string(), "dHash");
        assert_eq!(PerceptualAlgorithm::Ahash.to_string(), "aHash");
    }

    #[test]
    fn test_perceptual_algorithm_thresholds() {
        assert_eq!(PerceptualAlgorithm::Dhash.default_threshold(), 10);
        assert_eq!(PerceptualAlgorithm::Ahash.default_threshold(), 12);
        assert_eq!(PerceptualAlgorithm::Phash.default_threshold(), 8);
    }

    #[test]
    fn test_algorithm_from_name_aliases_and_fallback() {
        assert_eq!(PerceptualAlgorithm::from_name("difference"), PerceptualAlgorithm::Dhash);
        assert_eq!(PerceptualAlgorithm::from_name("AVERAGE"), PerceptualAlgorithm::Ahash);
        assert_eq!(PerceptualAlgorithm::from_name("perceptual"), PerceptualAlgorithm::Phash);
        assert_eq!(PerceptualAlgorithm::from_name("wavelet"), PerceptualAlgorithm::Dhash);
        assert_eq!(PerceptualAlgorithm::from_name(""), PerceptualAlgorithm::Dhash);
    }

    #[test]
    fn test_adaptive_threshold() {
        assert_eq!(adaptive_threshold(PerceptualAlgorithm::Dhash, Strictness::Normal), 10);
        assert_eq!(adaptive_threshold(PerceptualAlgorithm::Dhash, Strictness::Strict), 6);
        assert_eq!(adaptive_threshold(PerceptualAlgorithm::Dhash, Strictness::Loose), 15);
        assert_eq!(adaptive_threshold(PerceptualAlgorithm::Ahash, Strictness::Loose), 18);
        assert_eq!(adaptive_threshold(PerceptualAlgorithm::Phash, Strictness::Strict), 4);
    }

    #[test]
    fn test_fingerprint_parse_validation() {
        let ok = "01".repeat(32);
        assert_eq!(ok.parse::<Fingerprint>().unwrap().as_str(), ok);

        assert_eq!("0101".parse::<Fingerprint>(), Err(FingerprintError::Length(4)));

        let bad = format!("{}2", "0".repeat(63));
        assert_eq!(bad.parse::<Fingerprint>(), Err(FingerprintError::Character('2')));
    }

    #[test]
    fn test_fingerprint_bits_round_trip() {
        let fp = Fingerprint::from_bits(0x8000_0000_0000_0001);
        assert!(fp.as_str().starts_with('1'));
        assert!(fp.as_str().ends_with('1'));
        assert_eq!(fp.as_str().matches('1').count(), 2);
        assert_eq!(fp.to_bits(), 0x8000_0000_0000_0001);
    }

    #[test]
    fn test_fingerprint_distance() {
        let a = Fingerprint::from_bits(0);
        let b = Fingerprint::from_bits(0b1011);
        assert_eq!(a.distance(&b), 3);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&Fingerprint::from_bits(u64::MAX)), 64);
    }

    #[test]
    fn test_luminance_truncates() {
        assert_eq!(luminance(&Rgb([100, 150, 200])), 140);
        assert_eq!(luminance(&Rgb([0, 0, 0])), 0);
        assert_eq!(luminance(&Rgb([255, 255, 255])), 255);
    }

    #[test]
    fn test_gamma_lookup_values() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([0, 128, 255]));
        apply_gamma(&mut img, GAMMA);
        assert_eq!(img.get_pixel(0, 0).0, [0, 186, 255]);
    }

    #[test]
    fn test_equalize_two_levels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 10, 0]));
        img.put_pixel(1, 0, Rgb([255, 10, 0]));
        equalize_histogram(&mut img);

        // R: cdf(0) = 1/2, cdf(255) = 2/2
        assert_eq!(img.get_pixel(0, 0).0[0], 127);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
        // G: both pixels at the only level, cdf = 1
        assert_eq!(img.get_pixel(0, 0).0[1], 255);
        // B: both at zero, cdf(0) = 1
        assert_eq!(img.get_pixel(1, 0).0[2], 255);
    }

    #[test]
    fn test_box_blur_clamps_at_edges() {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(1, 1, Rgb([90, 90, 90]));
        let blurred = box_blur(&img);

        assert_eq!(blurred.get_pixel(1, 1).0, [10, 10, 10]); // 90 / 9
        assert_eq!(blurred.get_pixel(0, 0).0, [22, 22, 22]); // 90 / 4
        assert_eq!(blurred.get_pixel(1, 0).0, [15, 15, 15]); // 90 / 6
    }

    #[test]
    fn test_box_blur_single_pixel() {
        let img = RgbImage::from_pixel(1, 1, Rgb([7, 8, 9]));
        assert_eq!(box_blur(&img).get_pixel(0, 0).0, [7, 8, 9]);
    }

    #[test]
    fn test_dhash_bit_layout() {
        // Every row strictly darkens to the right, so every comparison is 1.
        let img = RgbImage::from_fn(9, 8, |x, _| Rgb([(250 - x * 20) as u8; 3]));
        let hasher = PerceptualHasher::new(PerceptualAlgorithm::Dhash)
            .with_preprocessing(Preprocessing::none());
        assert_eq!(hasher.fingerprint_rgb(img).as_str(), "1".repeat(64));

        // Brightening to the right, and ties, give 0.
        let img = RgbImage::from_fn(9, 8, |x, _| Rgb([(10 + x * 20) as u8; 3]));
        assert_eq!(hasher.fingerprint_rgb(img).as_str(), "0".repeat(64));
        let flat = RgbImage::from_pixel(9, 8, Rgb([50, 50, 50]));
        assert_eq!(hasher.fingerprint_rgb(flat).as_str(), "0".repeat(64));
    }

    #[test]
    fn test_ahash_bit_layout() {
        // Top half black, bottom half white: mean 127, white >= mean.
        let img = RgbImage::from_fn(8, 8, |_, y| {
            if y < 4 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let hasher = PerceptualHasher::new(PerceptualAlgorithm::Ahash)
            .with_preprocessing(Preprocessing::none());
        let expected = format!("{}{}", "0".repeat(32), "1".repeat(32));
        assert_eq!(hasher.fingerprint_rgb(img).as_str(), expected);
    }

    #[test]
    fn test_ahash_uniform_image_is_all_ones() {
        let img = RgbImage::from_pixel(8, 8, Rgb([77, 77, 77]));
        let hasher = PerceptualHasher::new(PerceptualAlgorithm::Ahash)
            .with_preprocessing(Preprocessing::none());
        assert_eq!(hasher.fingerprint_rgb(img).as_str(), "1".repeat(64));
    }

    #[test]
    fn test_dct_constant_block() {
        let n = 32;
        let pixels = vec![10.0; n * n];
        let dct = dct_2d(&pixels, n);

        // DC = 2/n * 1/2 * n² * 10 = n * 10
        assert!((dct[0] - 320.0).abs() < 1e-9, "dc = {}", dct[0]);
        for (i, coef) in dct.iter().enumerate().skip(1) {
            assert!(coef.abs() < 1e-9, "coefficient {} = {}", i, coef);
        }
    }

    #[test]
    fn test_dct_horizontal_cosine_lands_in_first_row() {
        let n = 8;
        let pixels: Vec<f64> = (0..n * n)
            .map(|i| {
                let x = (i % n) as f64;
                ((2.0 * x + 1.0) * std::f64::consts::PI / (2.0 * n as f64)).cos()
            })
            .collect();
        let dct = dct_2d(&pixels, n);

        // Energy sits at v = 0, u = 1.
        let peak = dct[1];
        assert!(peak.abs() > 1.0);
        for (i, coef) in dct.iter().enumerate() {
            if i != 1 {
                assert!(coef.abs() < 1e-9, "coefficient {} = {}", i, coef);
            }
        }
    }

    #[test]
    fn test_phash_mean_leaves_out_dc_coefficient() {
        // Dark left half, bright right half: the AC terms sum negative, so
        // near-zero coefficients sit above the AC mean but below a mean that
        // counts the DC term.
        let img = RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([50, 50, 50])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let hasher = PerceptualHasher::new(PerceptualAlgorithm::Phash)
            .with_preprocessing(Preprocessing::none());
        let fp = hasher.fingerprint_rgb(img);

        let expected = format!("1011101{}", "1".repeat(57));
        assert_eq!(fp.as_str(), expected);

        let with_dc_in_mean = format!("1001000100{}", "0".repeat(54));
        assert_ne!(fp.as_str(), with_dc_in_mean);
        // DC still gets bit 0.
        assert!(fp.as_str().starts_with('1'));
    }

    #[test]
    fn test_all_algorithms_produce_64_bits_deterministically() {
        let img = DynamicImage::ImageRgb8(gradient(100, 100));
        for alg in PerceptualAlgorithm::ALL {
            let hasher = PerceptualHasher::new(alg);
            let first = hasher.fingerprint_image(&img);
            let second = hasher.fingerprint_image(&img);
            assert_eq!(first.as_str().len(), FINGERPRINT_BITS);
            assert_eq!(first, second, "{} not deterministic", alg);
        }
    }

    #[test]
    fn test_transparent_pixels_flatten_to_black() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 0]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.JPG")));
        assert!(is_image_file(Path::new("/x/y.jpeg")));
        assert!(is_image_file(Path::new("b.png")));
        assert!(is_image_file(Path::new("c.gif")));
        assert!(is_image_file(Path::new("d.WebP")));
        assert!(!is_image_file(Path::new("e.bmp")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn test_invalid_image() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("invalid.png");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not an image").unwrap();

        let hasher = PerceptualHasher::default();
        let result = hasher.fingerprint_file(&file_path);
        assert!(matches!(result, Err(PerceptualError::Load(..))));
    }

    #[test]
    fn test_missing_image() {
        let temp_dir = tempdir().unwrap();
        let result = PerceptualHasher::default().fingerprint_file(temp_dir.path().join("gone.png"));
        assert!(matches!(result, Err(PerceptualError::Io { .. })));
    }

    #[test]
    fn test_fingerprint_file_matches_in_memory() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("gradient.png");
        let img = gradient(64, 48);
        img.save(&file_path).unwrap();

        let hasher = PerceptualHasher::new(PerceptualAlgorithm::Phash);
        let from_file = hasher.fingerprint_file(&file_path).unwrap();
        let in_memory = hasher.fingerprint_rgb(img);
        assert_eq!(from_file, in_memory);
    }
}
