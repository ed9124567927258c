use std::collections::HashMap;

use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PassageError;

static PASSAGE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/passages");

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Programming,
    Quotes,
    Literature,
    /// Player-supplied passage.
    Custom,
}

impl Category {
    pub const BUILT_IN: [Category; 4] = [
        Category::General,
        Category::Programming,
        Category::Quotes,
        Category::Literature,
    ];

    /// Next category in menu order, wrapping around. Custom is only part of
    /// the cycle when a custom passage exists.
    pub fn next(self, has_custom: bool) -> Self {
        match self {
            Category::General => Category::Programming,
            Category::Programming => Category::Quotes,
            Category::Quotes => Category::Literature,
            Category::Literature if has_custom => Category::Custom,
            Category::Literature | Category::Custom => Category::General,
        }
    }
}

#[derive(Deserialize, Debug)]
struct PassageFile {
    category: Category,
    passages: Vec<String>,
}

/// The fixed passage pools, one per built-in category.
#[derive(Debug, Clone)]
pub struct Passages {
    pools: HashMap<Category, Vec<String>>,
}

impl Passages {
    /// Loads every embedded pool.
    pub fn load() -> Result<Self, PassageError> {
        let mut pools = HashMap::new();
        for category in Category::BUILT_IN {
            let file_name = format!("{category}.json");
            let contents = PASSAGE_DIR
                .get_file(&file_name)
                .and_then(|f| f.contents_utf8())
                .ok_or_else(|| PassageError::Missing(category.to_string()))?;

            let file: PassageFile =
                serde_json::from_str(contents).map_err(|source| PassageError::Malformed {
                    file: file_name.clone(),
                    source,
                })?;
            if file.passages.is_empty() {
                return Err(PassageError::Empty(category.to_string()));
            }
            pools.insert(file.category, file.passages);
        }
        Ok(Self { pools })
    }

    pub fn pool(&self, category: Category) -> &[String] {
        self.pools.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Picks one passage uniformly at random from the category's pool, or
    /// returns the custom text for [`Category::Custom`].
    pub fn pick<R: Rng + ?Sized>(
        &self,
        category: Category,
        custom: Option<&str>,
        rng: &mut R,
    ) -> Result<String, PassageError> {
        if category == Category::Custom {
            return custom
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .ok_or(PassageError::NoCustomText);
        }
        self.pool(category)
            .choose(rng)
            .cloned()
            .ok_or_else(|| PassageError::Empty(category.to_string()))
    }
}

/// Short identifier for a passage: its first 50 characters.
pub fn fingerprint(text: &str) -> String {
    text.chars().take(50).collect()
}
