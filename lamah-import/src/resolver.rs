use lamah_blob::{MediaAsset, MediaRole};

use crate::{archive::MediaMap, record::MediaRefs};

/// A media reference checked against the extracted files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'a> {
    Present(&'a MediaAsset),
    Missing(String),
}

impl Resolved<'_> {
    /// Detach from the media map. The payload is shared, not copied.
    pub fn into_owned(self) -> ResolvedMedia {
        match self {
            Self::Present(asset) => ResolvedMedia::Present(asset.clone()),
            Self::Missing(filename) => ResolvedMedia::Missing(filename),
        }
    }
}

/// Owned form of [`Resolved`], used once a record leaves the resolver stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMedia {
    Present(MediaAsset),
    Missing(String),
}

/// Matches media references to extracted files by exact base filename
pub struct MediaResolver;

impl MediaResolver {
    /// One entry per referenced role, in role order
    pub fn resolve<'a>(refs: &MediaRefs, media: &'a MediaMap) -> Vec<(MediaRole, Resolved<'a>)> {
        refs.iter()
            .filter(|(_, filename)| !filename.is_empty())
            .map(|(role, filename)| {
                let resolved = match media.get(filename) {
                    Some(asset) => Resolved::Present(asset),
                    None => Resolved::Missing(filename.to_string()),
                };
                (role, resolved)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(names: &[&str]) -> MediaMap {
        names
            .iter()
            .map(|name| (name.to_string(), MediaAsset::new(*name, name.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn test_present_and_missing() {
        let media = media(&["lion.jpg", "roar.mp3"]);
        let mut refs = MediaRefs::new();
        refs.insert(MediaRole::AnswerAudio, "roar.mp3");
        refs.insert(MediaRole::QuestionImage, "lion.jpg");
        refs.insert(MediaRole::QuestionVideo, "stampede.mp4");

        let resolved = MediaResolver::resolve(&refs, &media);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].0, MediaRole::QuestionImage);
        assert!(matches!(resolved[0].1, Resolved::Present(asset) if asset.filename == "lion.jpg"));
        assert_eq!(resolved[1], (MediaRole::QuestionVideo, Resolved::Missing("stampede.mp4".to_string())));
        assert_eq!(resolved[2].0, MediaRole::AnswerAudio);
    }

    #[test]
    fn test_matching_is_exact() {
        let media = media(&["Lion.jpg"]);
        let mut refs = MediaRefs::new();
        refs.insert(MediaRole::QuestionImage, "lion.jpg");
        assert!(matches!(MediaResolver::resolve(&refs, &media)[0].1, Resolved::Missing(_)));
    }

    #[test]
    fn test_no_refs_resolve_to_nothing() {
        assert!(MediaResolver::resolve(&MediaRefs::new(), &media(&["lion.jpg"])).is_empty());
    }

    #[test]
    fn test_into_owned_shares_payload() {
        let media = media(&["lion.jpg"]);
        let mut refs = MediaRefs::new();
        refs.insert(MediaRole::QuestionImage, "lion.jpg");
        let (_, resolved) = MediaResolver::resolve(&refs, &media).remove(0);
        match resolved.into_owned() {
            ResolvedMedia::Present(asset) => {
                assert_eq!(asset.data.as_ptr(), media["lion.jpg"].data.as_ptr());
            }
            other => panic!("expected present, got {:?}", other),
        }
    }
}
