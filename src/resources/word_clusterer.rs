use std::collections::HashMap;
use std::io::Read;
use std::iter::FromIterator;

use crate::errors::*;

pub trait WordClusterer: Send + Sync {
    fn get_cluster(&self, word: &str) -> Option<String>;
}

pub struct HashMapWordClusterer {
    values: HashMap<String, String>,
}

impl HashMapWordClusterer {
    /// Reads tab separated `word<TAB>cluster` lines
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(false)
            .from_reader(reader);
        let mut values = HashMap::<String, String>::new();
        for record in csv_reader.records() {
            let elements = record?;
            if let (Some(word), Some(cluster)) = (elements.get(0), elements.get(1)) {
                values.insert(word.to_string(), cluster.to_string());
            }
        }
        Ok(Self { values })
    }
}

impl FromIterator<(String, String)> for HashMapWordClusterer {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl WordClusterer for HashMapWordClusterer {
    fn get_cluster(&self, word: &str) -> Option<String> {
        self.values.get(word).cloned()
    }
}
