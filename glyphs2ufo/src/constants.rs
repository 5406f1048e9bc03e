//! Lib key prefixes and lookup tables shared across the converter

pub const PUBLIC_PREFIX: &str = "public.";
pub const GLYPHS_PREFIX: &str = "com.schriftgestaltung.";
pub const GLYPHLIB_PREFIX: &str = "com.schriftgestaltung.Glyphs.";
pub const UFO2FT_FILTERS_KEY: &str = "com.github.googlei18n.ufo2ft.filters";

pub const GLYPH_ORDER_KEY: &str = "public.glyphOrder";
pub const POSTSCRIPT_NAMES_KEY: &str = "public.postscriptNames";
pub const MARK_COLOR_KEY: &str = "public.markColor";
pub const VARIATION_FONT_ORIGIN: &str = "Variation Font Origin";

/// Kerning group prefixes as written by Glyphs
pub const SIDE1_PREFIX: &str = "@MMK_L_";
pub const SIDE2_PREFIX: &str = "@MMK_R_";

/// Kerning group prefixes as written in UFO groups.plist
pub const KERN1_PREFIX: &str = "public.kern1.";
pub const KERN2_PREFIX: &str = "public.kern2.";

/// Oldest Glyphs build whose sources convert reliably (2.3)
pub const MIN_APP_VERSION: u32 = 895;

/// Glyphs color labels by index, as UFO `r,g,b,a` strings
pub const GLYPHS_COLORS: [&str; 12] = [
    "0.85,0.26,0.06,1",
    "0.99,0.62,0.11,1",
    "0.65,0.48,0.2,1",
    "0.97,1,0,1",
    "0.67,0.95,0.38,1",
    "0.04,0.57,0.04,1",
    "0,0.67,0.91,1",
    "0.18,0.16,0.78,1",
    "0.5,0.09,0.79,1",
    "0.98,0.36,0.67,1",
    "0.75,0.75,0.75,1",
    "0.25,0.25,0.25,1",
];

// https://learn.microsoft.com/en-us/typography/opentype/spec/os2#cpr
const CODEPAGE_TO_BIT: [(u32, u8); 31] = [
    (437, 63),
    (708, 61),
    (737, 60),
    (775, 59),
    (850, 62),
    (852, 58),
    (855, 57),
    (857, 56),
    (860, 55),
    (861, 54),
    (862, 53),
    (863, 52),
    (864, 51),
    (865, 50),
    (866, 49),
    (869, 48),
    (874, 16),
    (932, 17),
    (936, 18),
    (949, 19),
    (950, 20),
    (1250, 1),
    (1251, 2),
    (1252, 0),
    (1253, 3),
    (1254, 4),
    (1255, 5),
    (1256, 6),
    (1257, 7),
    (1258, 8),
    (1361, 21),
];

/// The OS/2 ulCodePageRange bit for a Windows code page
pub fn codepage_bit(codepage: u32) -> Option<u8> {
    CODEPAGE_TO_BIT
        .binary_search_by_key(&codepage, |(page, _)| *page)
        .ok()
        .map(|i| CODEPAGE_TO_BIT[i].1)
}

/// The color a Glyphs color index stands for, if it is one of the builtin labels
pub fn glyphs_color(index: i64) -> Option<&'static str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| GLYPHS_COLORS.get(i))
        .copied()
}
