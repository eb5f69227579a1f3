//! File and folder naming conventions for music albums.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// `CD1`, `Disc 02`, `disk_3`, `DISC-4`.
static DISC_FOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:cd|disc|disk)[\s._-]?([0-9]{1,2})$").expect("disc folder pattern")
});

/// `101 - Title`: one disc digit followed by a two-digit track number.
static MULTI_DISC_TRACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9])([0-9]{2})[-.\s]+(.+)$").expect("multi-disc track pattern")
});

/// `01 - Title`, `7. Title`, `012 Title`.
static TRACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,3})[-.\s]+(.+)$").expect("track pattern"));

/// How a track file name is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Leading number is the track number.
    #[default]
    Standard,
    /// A leading three-digit number encodes disc and track (`DTT`).
    MultiDisc,
}

/// Numbers and title recovered from a track file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTrack {
    pub disc: Option<u32>,
    pub track: Option<u32>,
    pub title: String,
}

impl ParsedTrack {
    fn untitled(stem: &str) -> Self {
        Self {
            disc: None,
            track: None,
            title: stem.to_string(),
        }
    }
}

/// Whether a folder name designates one disc of a multi-disc album.
pub fn is_disc_folder(name: &str) -> bool {
    DISC_FOLDER.is_match(name)
}

/// Disc number encoded in a folder name, 1 when it carries none.
pub fn disc_number(name: &str) -> u32 {
    DISC_FOLDER
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(1)
}

/// Parse a file stem (name without extension).
///
/// In [`ParseMode::MultiDisc`] the `DTT` form is tried first and standard
/// parsing is the fallback. A stem matching neither form keeps its raw text
/// as the title and carries no numbers.
pub fn parse_track_name(stem: &str, mode: ParseMode) -> ParsedTrack {
    if mode == ParseMode::MultiDisc
        && let Some(parsed) = parse_multi_disc(stem)
    {
        return parsed;
    }

    match TRACK.captures(stem) {
        Some(caps) => ParsedTrack {
            disc: None,
            track: caps[1].parse().ok(),
            title: caps[2].trim().to_string(),
        },
        None => ParsedTrack::untitled(stem),
    }
}

fn parse_multi_disc(stem: &str) -> Option<ParsedTrack> {
    let caps = MULTI_DISC_TRACK.captures(stem)?;
    Some(ParsedTrack {
        disc: caps[1].parse().ok(),
        track: caps[2].parse().ok(),
        title: caps[3].trim().to_string(),
    })
}

/// Disc a loose file belongs to under the `DTT` convention, 1 otherwise.
pub fn disc_group(stem: &str) -> u32 {
    parse_multi_disc(stem).and_then(|p| p.disc).unwrap_or(1)
}

/// Whether a set of stems spans more than one disc under the `DTT`
/// convention.
pub fn detect_multi_disc<'a>(stems: impl IntoIterator<Item = &'a str>) -> bool {
    stems
        .into_iter()
        .map(disc_group)
        .collect::<BTreeSet<_>>()
        .len()
        > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_folders() {
        for name in ["CD1", "cd 2", "Disc 1", "DISC_03", "disk-4", "Disc.12", "disc10"] {
            assert!(is_disc_folder(name), "{name}");
        }
        for name in ["Disco 1", "CD", "Disc 123", "Bonus CD1", "CD1 Extras", "Album"] {
            assert!(!is_disc_folder(name), "{name}");
        }
    }

    #[test]
    fn test_disc_number() {
        assert_eq!(disc_number("CD1"), 1);
        assert_eq!(disc_number("Disc 02"), 2);
        assert_eq!(disc_number("disk_12"), 12);
        assert_eq!(disc_number("Album"), 1);
    }

    #[test]
    fn test_standard_parsing() {
        let parsed = parse_track_name("01 - Come Together", ParseMode::Standard);
        assert_eq!(parsed.track, Some(1));
        assert_eq!(parsed.disc, None);
        assert_eq!(parsed.title, "Come Together");

        assert_eq!(parse_track_name("7. Seven", ParseMode::Standard).track, Some(7));
        assert_eq!(parse_track_name("012 Twelve", ParseMode::Standard).track, Some(12));

        // in standard mode a DTT number is just a track number
        let parsed = parse_track_name("101 - A", ParseMode::Standard);
        assert_eq!(parsed.track, Some(101));
        assert_eq!(parsed.disc, None);
    }

    #[test]
    fn test_multi_disc_parsing() {
        let parsed = parse_track_name("203 - Help", ParseMode::MultiDisc);
        assert_eq!(parsed.disc, Some(2));
        assert_eq!(parsed.track, Some(3));
        assert_eq!(parsed.title, "Help");

        // falls back to standard parsing
        let parsed = parse_track_name("05 - Five", ParseMode::MultiDisc);
        assert_eq!(parsed.disc, None);
        assert_eq!(parsed.track, Some(5));
    }

    #[test]
    fn test_unparsable_stem() {
        for stem in ["Intro", "01", "Track"] {
            let parsed = parse_track_name(stem, ParseMode::MultiDisc);
            assert_eq!(parsed, ParsedTrack::untitled(stem));
        }
    }

    #[test]
    fn test_detect_multi_disc() {
        assert!(detect_multi_disc(["101 - A", "102 - B", "201 - C"]));
        assert!(!detect_multi_disc(["101 - A", "102 - B"]));
        assert!(!detect_multi_disc(["01 - A", "02 - B"]));
        // unmatched names count as disc 1
        assert!(detect_multi_disc(["Intro", "201 - C"]));
        assert!(!detect_multi_disc(std::iter::empty()));
    }
}
