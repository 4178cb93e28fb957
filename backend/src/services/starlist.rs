//! Observatory target lists.
//!
//! Configurations are first flattened into [`StarlistEntry`] pointings, one
//! for the science coordinate and one for an attached offset star. Identical
//! pointings are dropped, then every entry gets a name that is unique after
//! truncation to the layout's name width.

use std::collections::HashSet;

use qtty::Degrees;
use serde::{Deserialize, Serialize};

use crate::models::{Configuration, Coordinate, Target};
use crate::services::offset::Offset;

/// Supported target-list layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarlistFormat {
    /// Keck starlist: spaced sexagesimal, `key=value` keywords, `#` comments
    #[default]
    Keck,
    /// Palomar TCS list: colon sexagesimal, keywords after a `!` comment mark
    Palomar,
}

/// Keck name field: at most 15 characters, no embedded whitespace.
pub const KECK_NAME_WIDTH: usize = 15;

/// Palomar name field width.
pub const PALOMAR_NAME_WIDTH: usize = 20;

/// Suffix of the pointing that acquires a configuration's offset star.
pub const OFFSET_STAR_SUFFIX: &str = "_OS";

impl StarlistFormat {
    pub fn name_width(self) -> usize {
        match self {
            StarlistFormat::Keck => KECK_NAME_WIDTH,
            StarlistFormat::Palomar => PALOMAR_NAME_WIDTH,
        }
    }
}

/// One pointing of a target list, before layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StarlistEntry {
    /// Full name with whitespace replaced by `_`; truncated at render time.
    pub name: String,
    pub coordinate: Coordinate,
    pub position_angle: Option<Degrees>,
    /// Offset from this pointing to the science coordinate.
    pub offset: Option<Offset>,
    pub comment: Option<String>,
}

fn entry_name(target: &str, configuration: &str) -> String {
    let raw = if configuration.is_empty() {
        target.to_string()
    } else {
        format!("{}_{}", target, configuration)
    };
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Pointings for one configuration: the science coordinate, then the offset
/// star when one is attached. Empty when the configuration has no coordinate.
pub fn configuration_entries(target: &Target, config: &Configuration) -> Vec<StarlistEntry> {
    let Some(coordinate) = config.coordinates else {
        return Vec::new();
    };
    let name = entry_name(target.name(), &config.name);
    let position_angle = config.recognized.position_angle;

    let mut entries = vec![StarlistEntry {
        name: name.clone(),
        coordinate,
        position_angle,
        offset: None,
        comment: config.obstype.clone(),
    }];
    if let Some(star) = &config.offset_star {
        entries.push(StarlistEntry {
            name: format!("{}{}", name, OFFSET_STAR_SUFFIX),
            coordinate: star.coordinate,
            position_angle,
            offset: Some(star.offset),
            comment: Some(format!("offset star for {}", name)),
        });
    }
    entries
}

/// Hands out names that stay distinct after truncation to `width`.
///
/// A name that collides with one already issued keeps as much of its prefix
/// as fits in front of a `_2`, `_3`, ... suffix.
struct NameTable {
    width: usize,
    issued: HashSet<String>,
}

impl NameTable {
    fn new(width: usize) -> Self {
        Self {
            width,
            issued: HashSet::new(),
        }
    }

    fn claim(&mut self, name: &str) -> String {
        let truncated: String = name.chars().take(self.width).collect();
        if self.issued.insert(truncated.clone()) {
            return truncated;
        }

        let mut n = 2usize;
        loop {
            let suffix = format!("_{}", n);
            let keep = self.width.saturating_sub(suffix.len());
            let candidate: String = name.chars().take(keep).chain(suffix.chars()).collect();
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn keck_line(name: &str, entry: &StarlistEntry) -> String {
    let mut line = format!(
        "{:<width$} {} 2000",
        name,
        entry.coordinate.to_sexagesimal_spaced(),
        width = KECK_NAME_WIDTH
    );
    if let Some(offset) = &entry.offset {
        line.push_str(&format!(
            " raoff={:.2} decoff={:.2}",
            offset.delta_ra.value(),
            offset.delta_dec.value()
        ));
    }
    if let Some(pa) = entry.position_angle {
        line.push_str(&format!(" rotdest={:.2} rotmode=pa", pa.value()));
    }
    if let Some(comment) = &entry.comment {
        line.push_str(&format!(" # {}", comment));
    }
    line
}

fn palomar_line(name: &str, entry: &StarlistEntry) -> String {
    let mut line = format!(
        "{:<width$} {} 2000.0",
        name,
        entry.coordinate.to_sexagesimal_colons(),
        width = PALOMAR_NAME_WIDTH
    );

    let mut notes: Vec<String> = Vec::new();
    if let Some(offset) = &entry.offset {
        notes.push(format!(
            "raoff={:.2} decoff={:.2}",
            offset.delta_ra.value(),
            offset.delta_dec.value()
        ));
    }
    if let Some(pa) = entry.position_angle {
        notes.push(format!("PA={:.2}", pa.value()));
    }
    if let Some(comment) = &entry.comment {
        notes.push(comment.clone());
    }
    if !notes.is_empty() {
        line.push_str(" ! ");
        line.push_str(&notes.join(" "));
    }
    line
}

/// Target list for every configuration of `targets`, in target then
/// configuration order.
///
/// Targets without configurations contribute a bare line for their own
/// coordinate. Repeated pointings are listed once.
pub fn render_starlist<'a, I>(targets: I, format: StarlistFormat) -> String
where
    I: IntoIterator<Item = &'a Target>,
{
    let mut entries: Vec<StarlistEntry> = Vec::new();
    for target in targets {
        let candidates = if target.configurations().is_empty() {
            let mut bare = Configuration::new("");
            bare.coordinates = target.coordinate().copied();
            configuration_entries(target, &bare)
        } else {
            target
                .configurations()
                .iter()
                .flat_map(|config| configuration_entries(target, config))
                .collect()
        };
        for entry in candidates {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }

    let mut names = NameTable::new(format.name_width());
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            let name = names.claim(&entry.name);
            match format {
                StarlistFormat::Keck => keck_line(&name, entry),
                StarlistFormat::Palomar => palomar_line(&name, entry),
            }
        })
        .collect();

    log::debug!("Rendered {} {:?} starlist lines", lines.len(), format);
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AngleValue, ConfigSelector, Frame, NewConfiguration};

    fn m82() -> Target {
        let mut target =
            Target::with_coordinate("M82", Coordinate::from_degrees(148.9685, 69.6797).unwrap());
        target
            .add_configuration(
                NewConfiguration::new("primary")
                    .obstype("spectroscopy")
                    .with("slit_length", AngleValue::arcsec(128.0))
                    .with("slit_width", AngleValue::arcsec(1.5))
                    .with("PA", AngleValue::deg(60.0)),
            )
            .unwrap();
        target
    }

    fn with_offset_star(mut target: Target) -> Target {
        target
            .add_offset_star(&"148.928 69.6897".into(), None, Frame::Icrs, &ConfigSelector::All)
            .unwrap();
        target
    }

    #[test]
    fn test_keck_line_layout() {
        let text = render_starlist([&m82()], StarlistFormat::Keck);
        let line = text.lines().next().unwrap();
        assert!(line.starts_with("M82_primary     09 55 52.44 +69 40 46.9 2000"), "{}", line);
        assert!(line.contains("rotdest=60.00 rotmode=pa"));
        assert!(line.ends_with("# spectroscopy"));
        // RA starts in column 17
        assert_eq!(&line[16..18], "09");
    }

    #[test]
    fn test_offset_star_gets_its_own_keck_line() {
        let target = with_offset_star(m82());
        let text = render_starlist([&target], StarlistFormat::Keck);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{}", text);

        // Science line keeps the target coordinate and carries no offsets
        assert!(lines[0].starts_with("M82_primary     09 55 52.44 +69 40 46.9 2000"));
        assert!(!lines[0].contains("raoff"));

        // Star line sits at the star and offsets back to the target
        assert!(
            lines[1].starts_with("M82_primary_OS  09 55 42.72 +69 41 22.9 2000"),
            "{}",
            lines[1]
        );
        assert!(lines[1].contains("raoff=50.62 decoff=-36.00"), "{}", lines[1]);
        assert!(lines[1].contains("rotdest=60.00 rotmode=pa"));
        assert!(lines[1].ends_with("# offset star for M82_primary"));
    }

    #[test]
    fn test_palomar_layout() {
        let target = with_offset_star(m82());
        let text = render_starlist([&target], StarlistFormat::Palomar);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "M82_primary          09:55:52.44 +69:40:46.9 2000.0 ! PA=60.00 spectroscopy"
        );
        assert!(
            lines[1].starts_with("M82_primary_OS       09:55:42.72 +69:41:22.9 2000.0 ! raoff=50.62 decoff=-36.00"),
            "{}",
            lines[1]
        );
        // RA starts in column 22
        assert_eq!(&lines[0][21..23], "09");
    }

    #[test]
    fn test_palomar_line_without_notes() {
        let bare = Target::with_coordinate("M101", Coordinate::from_degrees(210.8, 54.35).unwrap());
        let text = render_starlist([&bare], StarlistFormat::Palomar);
        assert_eq!(text, "M101                 14:03:12.00 +54:21:00.0 2000.0\n");
    }

    #[test]
    fn test_names_have_whitespace_removed() {
        assert_eq!(entry_name("NGC 4993", "long slit"), "NGC_4993_long_slit");
        assert_eq!(entry_name("M82", ""), "M82");
    }

    #[test]
    fn test_truncated_names_stay_unique() {
        let mut target =
            Target::with_coordinate("NGC 4993", Coordinate::from_degrees(197.45, -23.38).unwrap());
        for name in ["long slit blue", "long slit red"] {
            target.add_configuration(NewConfiguration::new(name)).unwrap();
        }
        let text = render_starlist([&target], StarlistFormat::Keck);
        let names: Vec<_> = text.lines().map(|l| &l[..KECK_NAME_WIDTH]).collect();
        assert_eq!(names, vec!["NGC_4993_long_s", "NGC_4993_long_2"]);

        // The wider Palomar field keeps both names whole
        let text = render_starlist([&target], StarlistFormat::Palomar);
        let names: Vec<_> = text.lines().map(|l| l[..PALOMAR_NAME_WIDTH].trim_end()).collect();
        assert_eq!(names, vec!["NGC_4993_long_slit_b", "NGC_4993_long_slit_r"]);
    }

    #[test]
    fn test_name_table_suffixes() {
        let mut table = NameTable::new(5);
        assert_eq!(table.claim("abcdefg"), "abcde");
        assert_eq!(table.claim("abcdexyz"), "abc_2");
        assert_eq!(table.claim("abcdeq"), "abc_3");
        assert_eq!(table.claim("ab"), "ab");
    }

    #[test]
    fn test_duplicate_lines_are_dropped() {
        let target = m82();
        let text = render_starlist([&target, &target], StarlistFormat::Keck);
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_configuration_without_coordinate_is_skipped() {
        let mut target = Target::new("mystery");
        target.add_configuration(NewConfiguration::new("imaging")).unwrap();
        assert_eq!(render_starlist([&target], StarlistFormat::Keck), "");

        let bare = Target::with_coordinate("M101", Coordinate::from_degrees(210.8, 54.35).unwrap());
        let text = render_starlist([&bare], StarlistFormat::Keck);
        assert!(text.starts_with("M101            14 03 12.00 +54 21 00.0 2000"), "{}", text);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(serde_json::to_string(&StarlistFormat::Palomar).unwrap(), "\"palomar\"");
        let keck: StarlistFormat = serde_json::from_str("\"keck\"").unwrap();
        assert_eq!(keck, StarlistFormat::Keck);
    }
}
