//! Loaded video catalog and the views derived from it.

use crate::domain::{User, Video, VideoId};

/// Videos sharing a category, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category: &'a str,
    pub videos: Vec<&'a Video>,
}

/// The video list most recently fetched from the content API.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    videos: Vec<Video>,
}

impl Catalog {
    pub fn new(videos: Vec<Video>) -> Self {
        Self { videos }
    }

    /// Replaces the whole list with a fresh fetch.
    pub fn replace(&mut self, videos: Vec<Video>) {
        tracing::debug!(count = videos.len(), "Catalog replaced");
        self.videos = videos;
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn get(&self, video_id: VideoId) -> Option<&Video> {
        self.videos.iter().find(|video| video.id == video_id)
    }

    /// Groups videos by category.
    ///
    /// Groups appear in the order their first video was loaded, and videos
    /// keep their load order within a group.
    pub fn by_category(&self) -> Vec<CategoryGroup<'_>> {
        let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
        for video in &self.videos {
            match groups
                .iter_mut()
                .find(|group| group.category == video.category)
            {
                Some(group) => group.videos.push(video),
                None => groups.push(CategoryGroup {
                    category: &video.category,
                    videos: vec![video],
                }),
            }
        }
        groups
    }

    /// Catalog videos the user has marked as favorite.
    pub fn favorites(&self, user: &User) -> Vec<&Video> {
        self.videos
            .iter()
            .filter(|video| user.is_favorite(video.id))
            .collect()
    }

    /// Video featured in the hero teaser: the last one loaded.
    pub fn teaser(&self) -> Option<&Video> {
        self.videos.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Video::new(1, "Ocean", "Nature"),
            Video::new(2, "Heist", "Crime"),
            Video::new(3, "Forest", "Nature"),
            Video::new(4, "Alibi", "Crime"),
        ])
    }

    #[test]
    fn test_groups_keep_load_order() {
        let catalog = catalog();
        let groups = catalog.by_category();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Nature");
        assert_eq!(
            groups[0].videos.iter().map(|v| v.id.as_u64()).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(groups[1].category, "Crime");
        assert_eq!(
            groups[1].videos.iter().map(|v| v.id.as_u64()).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_favorites_follow_user_set() {
        let catalog = catalog();
        let mut user = User::default();
        user.set_favorites([VideoId::new(4), VideoId::new(2), VideoId::new(99)]);

        let favorites = catalog.favorites(&user);
        assert_eq!(
            favorites.iter().map(|v| v.id.as_u64()).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_teaser_is_last_video() {
        assert_eq!(catalog().teaser().map(|v| v.id), Some(VideoId::new(4)));
        assert!(Catalog::default().teaser().is_none());
    }

    #[test]
    fn test_replace_discards_previous_list() {
        let mut catalog = catalog();
        catalog.replace(vec![Video::new(9, "Solo", "Drama")]);

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(VideoId::new(1)).is_none());
        assert!(catalog.get(VideoId::new(9)).is_some());
    }
}
