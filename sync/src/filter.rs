//! Album selection by title keyword.

use api_client::Album;

/// Title fragments that mark an album as a highlight reel.
pub const HIGHLIGHT_KEYWORDS: [&str; 2] = ["highlights", "hyperlight"];

/// Case-insensitive substring match on album titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumFilter {
    keywords: Vec<String>,
}

impl Default for AlbumFilter {
    fn default() -> Self {
        AlbumFilter::new(HIGHLIGHT_KEYWORDS)
    }
}

impl AlbumFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        AlbumFilter {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Albums without a title never match.
    pub fn matches(&self, album: &Album) -> bool {
        let title = match &album.title {
            Some(title) => title.to_lowercase(),
            None => return false,
        };
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    /// Keep the matching albums, preserving order.
    pub fn apply<I>(&self, albums: I) -> Vec<Album>
    where
        I: IntoIterator<Item = Album>,
    {
        albums.into_iter().filter(|a| self.matches(a)).collect()
    }
}

pub fn filter_highlight_albums<I>(albums: I) -> Vec<Album>
where
    I: IntoIterator<Item = Album>,
{
    AlbumFilter::default().apply(albums)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(id: &str, title: Option<&str>) -> Album {
        Album {
            id: id.to_string(),
            title: title.map(str::to_string),
            product_url: None,
            media_items_count: None,
            cover_photo_base_url: None,
        }
    }

    fn ids(albums: &[Album]) -> Vec<&str> {
        albums.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_keeps_matching_titles_in_order() {
        let albums = vec![
            album("1", Some("Summer HIGHLIGHTS 2023")),
            album("2", Some("Groceries")),
            album("3", Some("Hyperlight reel")),
            album("4", None),
            album("5", Some("weekly highlights")),
        ];
        let kept = filter_highlight_albums(albums);
        assert_eq!(ids(&kept), vec!["1", "3", "5"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_highlight_albums(Vec::new()).is_empty());
    }

    #[test]
    fn test_singular_highlight_is_not_enough() {
        let kept = filter_highlight_albums(vec![album("1", Some("Highlight of the year"))]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_custom_keywords_are_case_insensitive() {
        let filter = AlbumFilter::new(["Trip"]);
        assert_eq!(filter.keywords(), ["trip".to_string()]);
        let kept = filter.apply(vec![album("1", Some("My TRIP 2024")), album("2", Some("Home"))]);
        assert_eq!(ids(&kept), vec!["1"]);
    }
}
