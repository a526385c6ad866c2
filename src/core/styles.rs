use super::rag::NewStyleRecord;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Native style names mapped to the canonical labels used by the index
static STYLE_LEXICON: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("赛博朋克", "Cyberpunk"),
        ("水彩", "Watercolor"),
        ("水彩画", "Watercolor"),
        ("油画", "Oil Painting"),
        ("动漫", "Anime"),
        ("二次元", "Anime"),
        ("日漫", "Anime"),
        ("像素", "Pixel Art"),
        ("像素风", "Pixel Art"),
        ("水墨", "Ink Wash"),
        ("水墨画", "Ink Wash"),
        ("国画", "Ink Wash"),
        ("蒸汽朋克", "Steampunk"),
        ("写实", "Photorealistic"),
        ("真实", "Photorealistic"),
        ("浮世绘", "Ukiyo-e"),
        ("极简", "Minimalist"),
        ("极简主义", "Minimalist"),
    ])
});

/// Canonical label for a native style name
pub fn translate_style(style: &str) -> Option<&'static str> {
    STYLE_LEXICON.get(style.trim()).copied()
}

/// (label, prompt fragment, description) of the bootstrap styles
const SEED_STYLES: &[(&str, &str, &str)] = &[
    (
        "Cyberpunk",
        "cyberpunk style, neon lights, rain-soaked futuristic city, high contrast magenta and cyan",
        "赛博朋克 dystopian high-tech aesthetic",
    ),
    (
        "Watercolor",
        "watercolor painting, soft washes, bleeding pigments, textured paper",
        "水彩 translucent hand-painted look",
    ),
    (
        "Oil Painting",
        "oil painting, thick impasto brushstrokes, rich canvas texture, classical lighting",
        "油画 traditional fine-art painting",
    ),
    (
        "Anime",
        "anime style, cel shading, clean line art, vibrant colors",
        "动漫 Japanese animation look",
    ),
    (
        "Pixel Art",
        "pixel art, 16-bit sprite, limited palette, crisp pixels",
        "像素 retro video game graphics",
    ),
    (
        "Ink Wash",
        "traditional Chinese ink wash painting, flowing brush strokes, rice paper, negative space",
        "水墨 monochrome ink painting",
    ),
    (
        "Steampunk",
        "steampunk style, brass gears, Victorian machinery, sepia tones",
        "蒸汽朋克 retro-futuristic steam technology",
    ),
    (
        "Photorealistic",
        "photorealistic, ultra detailed, natural lighting, 85mm lens, sharp focus",
        "写实 indistinguishable from a photograph",
    ),
    (
        "Ukiyo-e",
        "ukiyo-e woodblock print, flat colors, bold outlines, Edo period",
        "浮世绘 Japanese woodblock art",
    ),
    (
        "Minimalist",
        "minimalist design, clean composition, generous negative space, muted palette",
        "极简 reduced to essentials",
    ),
];

/// System-protected records seeded into every index at bootstrap
pub fn seed_styles() -> Vec<NewStyleRecord> {
    SEED_STYLES
        .iter()
        .map(|(label, fragment, description)| NewStyleRecord {
            id: Some(format!("seed-{}", label.to_lowercase().replace(' ', "-"))),
            label: label.to_string(),
            prompt_fragment: fragment.to_string(),
            description: Some(description.to_string()),
            tags: vec!["seed".to_string()],
            metadata: Default::default(),
            is_system_protected: true,
        })
        .collect()
}
