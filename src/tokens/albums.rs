/// Album discovery and operator selection parsing
use crate::error::GalleryResult;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

const DESCRIPTOR_EXTENSION: &str = ".json";

/// An album available to the gallery, found through its descriptor file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub file_name: String,
    /// Identifier stored in token records
    pub slug: String,
    pub title: String,
}

impl Album {
    /// Build an album from a descriptor file name, if it is one
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let slug = strip_descriptor_extension(file_name)?;
        let title = slug.replace('_', " ").trim().to_string();

        Some(Self {
            file_name: file_name.to_string(),
            slug: slug.to_string(),
            title: if title.is_empty() {
                slug.to_string()
            } else {
                title
            },
        })
    }
}

/// List album descriptors in `dir`, sorted by file name
///
/// A missing directory yields no albums.
pub fn discover_albums(dir: &Path) -> GalleryResult<Vec<Album>> {
    if !dir.is_dir() {
        debug!("Album directory {:?} not found", dir);
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let albums: Vec<Album> = names.iter().filter_map(|n| Album::from_file_name(n)).collect();
    debug!("Found {} album descriptors in {:?}", albums.len(), dir);
    Ok(albums)
}

/// Outcome of parsing an album selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumSelection {
    /// Selected slugs, de-duplicated and sorted
    pub albums: Vec<String>,
    /// Indices that were outside the displayed list
    pub out_of_range: Vec<String>,
}

impl AlbumSelection {
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

/// Parse operator input against the displayed album list
///
/// Accepts `*` for every album, or a comma/semicolon separated mix of
/// 1-based indices and album names (a `.json` suffix is dropped).
pub fn parse_album_selection(input: &str, albums: &[Album]) -> AlbumSelection {
    let input = input.trim();

    if input == "*" {
        return AlbumSelection {
            albums: albums.iter().map(|a| a.slug.clone()).collect(),
            out_of_range: Vec::new(),
        };
    }

    let mut selected = BTreeSet::new();
    let mut out_of_range = Vec::new();

    for part in input.split([',', ';']).map(str::trim).filter(|p| !p.is_empty()) {
        if part.chars().all(|c| c.is_ascii_digit()) {
            match part.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| albums.get(i)) {
                Some(album) => {
                    selected.insert(album.slug.clone());
                }
                None => out_of_range.push(part.to_string()),
            }
        } else {
            let slug = strip_descriptor_extension(part).unwrap_or(part);
            if !slug.is_empty() {
                selected.insert(slug.to_string());
            }
        }
    }

    AlbumSelection {
        albums: selected.into_iter().collect(),
        out_of_range,
    }
}

fn strip_descriptor_extension(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(DESCRIPTOR_EXTENSION.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, extension) = name.split_at(split);
    extension
        .eq_ignore_ascii_case(DESCRIPTOR_EXTENSION)
        .then_some(stem)
}
