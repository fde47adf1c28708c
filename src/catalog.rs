//! Themed keyword catalog and random keyword selection.
//!
//! The built-in catalog is static data. Every selection takes the random source
//! as a parameter so games can be replayed from a seed.

use anyhow::{Context, Result, ensure};
use once_cell::sync::Lazy;
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info, warn};

/// Theme used when a requested theme does not exist.
pub const DEFAULT_THEME: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordData {
    pub definition: String,
    pub expected_words: Vec<String>,
}

/// A keyword with everything a round needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordCard {
    pub keyword: String,
    pub definition: String,
    pub expected_words: Vec<String>,
}

impl KeywordCard {
    fn from_data(keyword: &str, data: &KeywordData) -> Self {
        Self {
            keyword: keyword.to_string(),
            definition: data.definition.clone(),
            expected_words: data.expected_words.clone(),
        }
    }
}

type Theme = BTreeMap<String, KeywordData>;

/// theme -> keyword -> definition and expected words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    themes: BTreeMap<String, Theme>,
}

static BUILTIN: Lazy<Catalog> = Lazy::new(build_builtin);

impl Catalog {
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Parses a catalog from JSON. A non-empty `"all"` theme is required.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json).context("invalid catalog JSON")?;
        ensure!(
            catalog
                .themes
                .get(DEFAULT_THEME)
                .is_some_and(|theme| !theme.is_empty()),
            "catalog must define a non-empty \"{}\" theme",
            DEFAULT_THEME
        );
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&text)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
        info!(path = %path.display(), themes = catalog.themes.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    /// The requested theme, or the default theme when it is unknown.
    fn resolve(&self, theme: &str) -> Option<&Theme> {
        self.themes.get(theme).or_else(|| {
            debug!(theme, "unknown theme, using {}", DEFAULT_THEME);
            self.themes.get(DEFAULT_THEME)
        })
    }

    pub fn keywords(&self, theme: &str) -> Vec<&str> {
        self.resolve(theme)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn entry(&self, theme: &str, keyword: &str) -> Option<KeywordCard> {
        self.lookup(theme, keyword)
            .map(|data| KeywordCard::from_data(keyword, data))
    }

    /// Expected words for a keyword; empty when the keyword is unknown.
    pub fn expected_words(&self, theme: &str, keyword: &str) -> &[String] {
        self.lookup(theme, keyword)
            .map(|data| data.expected_words.as_slice())
            .unwrap_or(&[])
    }

    /// Definition of a keyword; empty when the keyword is unknown.
    pub fn definition(&self, theme: &str, keyword: &str) -> &str {
        self.lookup(theme, keyword)
            .map(|data| data.definition.as_str())
            .unwrap_or("")
    }

    pub fn random_keyword<R: Rng + ?Sized>(&self, theme: &str, rng: &mut R) -> Option<KeywordCard> {
        let keywords = self.keywords(theme);
        let keyword = keywords.choose(rng)?;
        self.entry(theme, keyword)
    }

    fn lookup(&self, theme: &str, keyword: &str) -> Option<&KeywordData> {
        self.resolve(theme)?.get(keyword)
    }
}

/// Picks keywords for successive rounds, avoiding repeats until the theme runs out.
#[derive(Debug, Clone)]
pub struct KeywordPicker {
    theme: String,
    avoid_repeats: bool,
    used: Vec<String>,
}

impl KeywordPicker {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            avoid_repeats: true,
            used: Vec::new(),
        }
    }

    pub fn allowing_repeats(theme: impl Into<String>) -> Self {
        Self {
            avoid_repeats: false,
            ..Self::new(theme)
        }
    }

    pub fn used(&self) -> &[String] {
        &self.used
    }

    pub fn next<R: Rng + ?Sized>(&mut self, catalog: &Catalog, rng: &mut R) -> Option<KeywordCard> {
        if !self.avoid_repeats {
            return catalog.random_keyword(&self.theme, rng);
        }

        let all = catalog.keywords(&self.theme);
        let mut fresh: Vec<&str> = all
            .iter()
            .copied()
            .filter(|k| !self.used.iter().any(|u| u == k))
            .collect();

        if fresh.is_empty() && !all.is_empty() {
            info!(theme = %self.theme, "every keyword used, resetting");
            self.used.clear();
            fresh = all;
        }

        let keyword = fresh.choose(rng)?.to_string();
        self.used.push(keyword.clone());
        catalog.entry(&self.theme, &keyword)
    }
}

/// User-defined keywords for creative games, drawn without repeats.
#[derive(Debug, Clone, Default)]
pub struct CustomPool {
    cards: Vec<KeywordCard>,
    used: Vec<usize>,
}

impl CustomPool {
    /// Builds a pool, dropping cards with a blank keyword.
    pub fn new(cards: Vec<KeywordCard>) -> Self {
        let cards: Vec<KeywordCard> = cards
            .into_iter()
            .filter(|card| {
                let keep = !card.keyword.trim().is_empty();
                if !keep {
                    warn!("skipping custom keyword with a blank name");
                }
                keep
            })
            .collect();
        Self {
            cards,
            used: Vec::new(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read custom keywords {}", path.display()))?;
        let cards: Vec<KeywordCard> = serde_json::from_str(&text)
            .with_context(|| format!("invalid custom keywords in {}", path.display()))?;
        Ok(Self::new(cards))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<KeywordCard> {
        let mut available: Vec<usize> = (0..self.cards.len())
            .filter(|i| !self.used.contains(i))
            .collect();

        if available.is_empty() && !self.cards.is_empty() {
            info!("every custom keyword used, resetting");
            self.used.clear();
            available = (0..self.cards.len()).collect();
        }

        let index = *available.choose(rng)?;
        self.used.push(index);
        self.cards.get(index).cloned()
    }
}

const KEYWORDS: &[(&str, &str, &[&str])] = &[
    (
        "Santé",
        "État de bien-être physique, mental et social, pas seulement l'absence de maladie.",
        &["bien-être", "physique", "mental", "social", "maladie", "infirmité"],
    ),
    (
        "Prévention",
        "Mesures mises en place pour éviter ou réduire les risques professionnels.",
        &["éviter", "réduire", "supprimer", "risque", "santé", "physique", "mentale", "mesures"],
    ),
    (
        "Hygiène",
        "Mesures de prévention pour éviter les maladies.",
        &["prévention", "éviter", "maladies", "propreté", "infection", "contamination"],
    ),
    (
        "Sécurité",
        "Mesures pour éliminer un danger ou limiter les effets d'un accident.",
        &["danger", "accident", "éliminer", "diminuer", "mesures", "protection", "objectif"],
    ),
    (
        "Conditions de travail",
        "Organisation, cadre, environnement, relations et exigences liées au travail.",
        &["organisation", "cadre", "moyens", "environnement", "relations", "exigences", "entreprise"],
    ),
    (
        "Protection",
        "Moyens de défense contre un danger. Aide à assurer la sécurité.",
        &["danger", "protection", "sécurité", "exposition", "EPI", "filet", "aération", "ligne de vie"],
    ),
    (
        "Danger",
        "Source potentielle de dommage ou d'effet nocif.",
        &["dommage", "nocif", "préjudice", "source", "milieu", "travail", "santé"],
    ),
    (
        "Risque",
        "Conséquence prévisible d'un danger sur la santé.",
        &["danger", "santé", "conséquence", "accident", "prévisible", "altération"],
    ),
    (
        "Accident du travail",
        "Fait accidentel datable ayant causé une lésion dans un contexte professionnel.",
        &["accident", "travail", "lésion", "subordination", "lieu", "moment", "imputabilité"],
    ),
    (
        "Accident du trajet",
        "Accident survenu pendant un trajet domicile-travail ou repas-travail.",
        &["trajet", "domicile", "travail", "aller-retour", "repas", "accident", "sécurité sociale"],
    ),
    (
        "Maladie professionnelle",
        "Maladie causée par une exposition prolongée à un risque professionnel.",
        &["maladie", "exposition", "risque", "professionnelle", "tableaux", "INRS", "Cerfa"],
    ),
];

const THEMES: &[(&str, &[&str])] = &[
    ("prevention", &["Prévention", "Hygiène", "Protection"]),
    ("securite", &["Sécurité", "Protection", "Danger"]),
    ("sante", &["Santé", "Conditions de travail"]),
    ("risque", &["Risque", "Danger"]),
    ("accidents", &["Accident du travail", "Accident du trajet"]),
    ("maladie-pro", &["Maladie professionnelle"]),
];

fn build_builtin() -> Catalog {
    let all: Theme = KEYWORDS
        .iter()
        .map(|(keyword, definition, words)| {
            (
                keyword.to_string(),
                KeywordData {
                    definition: definition.to_string(),
                    expected_words: words.iter().map(|w| w.to_string()).collect(),
                },
            )
        })
        .collect();

    let mut themes = BTreeMap::new();
    for (name, keywords) in THEMES {
        let theme: Theme = keywords
            .iter()
            .filter_map(|k| all.get(*k).map(|data| (k.to_string(), data.clone())))
            .collect();
        themes.insert(name.to_string(), theme);
    }
    themes.insert(DEFAULT_THEME.to_string(), all);

    Catalog { themes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_builtin_themes() {
        let catalog = Catalog::builtin();
        let names: Vec<&str> = catalog.theme_names().collect();
        for theme in ["all", "prevention", "securite", "sante", "risque", "accidents", "maladie-pro"] {
            assert!(names.contains(&theme), "missing theme {}", theme);
        }
        assert_eq!(catalog.keywords("all").len(), 11);
        assert_eq!(catalog.keywords("accidents").len(), 2);
    }

    #[test]
    fn test_unknown_theme_falls_back_to_all() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.keywords("nope"), catalog.keywords(DEFAULT_THEME));
        assert!(!catalog.definition("nope", "Danger").is_empty());
    }

    #[test]
    fn test_direct_lookup() {
        let catalog = Catalog::builtin();
        let card = catalog.entry("sante", "Santé").unwrap();
        assert_eq!(card.expected_words[0], "bien-être");
        assert_eq!(
            catalog.expected_words("sante", "Santé"),
            card.expected_words.as_slice()
        );
        assert!(catalog.expected_words("sante", "Danger").is_empty());
        assert_eq!(catalog.definition("sante", "Inconnu"), "");
    }

    #[test]
    fn test_random_keyword_stays_in_theme() {
        let catalog = Catalog::builtin();
        let mut rng = rng();
        for _ in 0..20 {
            let card = catalog.random_keyword("risque", &mut rng).unwrap();
            assert!(card.keyword == "Risque" || card.keyword == "Danger");
        }
    }

    #[test]
    fn test_random_keyword_is_deterministic_for_a_seed() {
        let catalog = Catalog::builtin();
        let a = catalog.random_keyword("all", &mut rng());
        let b = catalog.random_keyword("all", &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_picker_avoids_repeats_then_resets() {
        let catalog = Catalog::builtin();
        let mut picker = KeywordPicker::new("securite");
        let mut rng = rng();

        let first_cycle: HashSet<String> = (0..3)
            .map(|_| picker.next(catalog, &mut rng).unwrap().keyword)
            .collect();
        assert_eq!(first_cycle.len(), 3);
        assert_eq!(picker.used().len(), 3);

        picker.next(catalog, &mut rng).unwrap();
        assert_eq!(picker.used().len(), 1);
    }

    #[test]
    fn test_picker_allowing_repeats_tracks_nothing() {
        let catalog = Catalog::builtin();
        let mut picker = KeywordPicker::allowing_repeats("securite");
        let mut rng = rng();

        for _ in 0..10 {
            let card = picker.next(catalog, &mut rng).unwrap();
            assert!(catalog.keywords("securite").contains(&card.keyword.as_str()));
        }
        assert!(picker.used().is_empty());
    }

    #[test]
    fn test_picker_on_empty_catalog() {
        let catalog = Catalog::default();
        let mut picker = KeywordPicker::new("all");
        assert!(picker.next(&catalog, &mut rng()).is_none());
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "all": {
                "Bruit": { "definition": "Son gênant.", "expectedWords": ["décibel", "casque"] }
            }
        }"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.expected_words("whatever", "Bruit").len(), 2);
    }

    #[test]
    fn test_catalog_from_json_requires_default_theme() {
        let json = r#"{ "sante": {} }"#;
        assert!(Catalog::from_json_str(json).is_err());
        assert!(Catalog::from_json_str("not json").is_err());
    }

    #[test]
    fn test_custom_pool_cycles() {
        let card = |k: &str| KeywordCard {
            keyword: k.to_string(),
            definition: String::new(),
            expected_words: vec![],
        };
        let mut pool = CustomPool::new(vec![card("Bruit"), card("  "), card("Chute")]);
        assert_eq!(pool.len(), 2);

        let mut rng = rng();
        let a = pool.next(&mut rng).unwrap().keyword;
        let b = pool.next(&mut rng).unwrap().keyword;
        assert_ne!(a, b);
        assert!(pool.next(&mut rng).is_some());
    }

    #[test]
    fn test_custom_pool_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(
            &path,
            r#"[{ "keyword": "Chute", "definition": "Tomber.", "expectedWords": ["hauteur"] }]"#,
        )
        .unwrap();
        let mut pool = CustomPool::from_json_file(&path).unwrap();
        assert_eq!(pool.next(&mut rng()).unwrap().expected_words, vec!["hauteur"]);
    }
}
