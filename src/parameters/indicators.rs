//! Playing and notation indicators.
//!
//! Playing indicators change how a note is performed (staccato, tremolo,
//! pedal). Notation indicators only change how it is written down (clef,
//! ottava, rehearsal marks). Notes built with
//! [`SimpleEvent::note`](crate::events::SimpleEvent::note) carry a default
//! collection of each. Only the neutral ottava is active in them.
//!
//! Indicators with arguments are active once all their arguments are set.
//! Indicators without arguments are plain flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that can be attached to a note and switched on or off.
pub trait Indicator {
    fn is_active(&self) -> bool;
}

impl Indicator for bool {
    fn is_active(&self) -> bool {
        *self
    }
}

/// Direction of an arpeggio or an ornament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HairpinSymbol {
    Crescendo,
    Decrescendo,
    /// Ends a running hairpin.
    Stop,
}

impl fmt::Display for HairpinSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            HairpinSymbol::Crescendo => "<",
            HairpinSymbol::Decrescendo => ">",
            HairpinSymbol::Stop => "!",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tremolo {
    pub n_flags: Option<u8>,
}

impl Indicator for Tremolo {
    fn is_active(&self) -> bool {
        self.n_flags.is_some()
    }
}

/// Articulation sign, e.g. `.` for staccato or `>` for an accent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Articulation {
    pub name: Option<String>,
}

impl Indicator for Articulation {
    fn is_active(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arpeggio {
    pub direction: Option<Direction>,
}

impl Indicator for Arpeggio {
    fn is_active(&self) -> bool {
        self.direction.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pedal {
    /// e.g. `sustain`, `sostenuto` or `corda`.
    pub pedal_type: Option<String>,
    /// `true` presses the pedal, `false` releases it.
    pub pedal_activity: Option<bool>,
}

impl Default for Pedal {
    fn default() -> Self {
        Self {
            pedal_type: None,
            pedal_activity: Some(true),
        }
    }
}

impl Indicator for Pedal {
    fn is_active(&self) -> bool {
        self.pedal_type.is_some() && self.pedal_activity.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringContactPoint {
    /// e.g. `ponticello` or `tasto`.
    pub contact_point: Option<String>,
}

impl Indicator for StringContactPoint {
    fn is_active(&self) -> bool {
        self.contact_point.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ornamentation {
    pub direction: Option<Direction>,
    pub n_times: Option<u32>,
}

impl Default for Ornamentation {
    fn default() -> Self {
        Self {
            direction: None,
            n_times: Some(1),
        }
    }
}

impl Indicator for Ornamentation {
    fn is_active(&self) -> bool {
        self.direction.is_some() && self.n_times.is_some()
    }
}

/// Harmonic produced by touching the string `n_semitones` above the stopped note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtificialHarmonic {
    pub n_semitones: Option<i32>,
}

impl Indicator for ArtificialHarmonic {
    fn is_active(&self) -> bool {
        self.n_semitones.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fermata {
    pub fermata_type: Option<String>,
}

impl Indicator for Fermata {
    fn is_active(&self) -> bool {
        self.fermata_type.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hairpin {
    pub symbol: Option<HairpinSymbol>,
}

impl Indicator for Hairpin {
    fn is_active(&self) -> bool {
        self.symbol.is_some()
    }
}

/// Every playing indicator a note can carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayingIndicators {
    pub articulation: Articulation,
    pub artificial_harmonic: ArtificialHarmonic,
    pub arpeggio: Arpeggio,
    pub bartok_pizzicato: bool,
    pub fermata: Fermata,
    pub hairpin: Hairpin,
    pub natural_harmonic: bool,
    pub laissez_vibrer: bool,
    pub ornamentation: Ornamentation,
    pub pedal: Pedal,
    pub prall: bool,
    pub string_contact_point: StringContactPoint,
    pub tie: bool,
    pub tremolo: Tremolo,
}

impl PlayingIndicators {
    /// All indicators with their names, in declaration order.
    pub fn indicators(&self) -> [(&'static str, &dyn Indicator); 14] {
        [
            ("articulation", &self.articulation),
            ("artificial_harmonic", &self.artificial_harmonic),
            ("arpeggio", &self.arpeggio),
            ("bartok_pizzicato", &self.bartok_pizzicato),
            ("fermata", &self.fermata),
            ("hairpin", &self.hairpin),
            ("natural_harmonic", &self.natural_harmonic),
            ("laissez_vibrer", &self.laissez_vibrer),
            ("ornamentation", &self.ornamentation),
            ("pedal", &self.pedal),
            ("prall", &self.prall),
            ("string_contact_point", &self.string_contact_point),
            ("tie", &self.tie),
            ("tremolo", &self.tremolo),
        ]
    }

    pub fn active(&self) -> Vec<&'static str> {
        active_names(&self.indicators())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarLine {
    /// Bar line style, e.g. `|.` or `||`.
    pub abbreviation: Option<String>,
}

impl Indicator for BarLine {
    fn is_active(&self) -> bool {
        self.abbreviation.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clef {
    pub name: Option<String>,
}

impl Indicator for Clef {
    fn is_active(&self) -> bool {
        self.name.is_some()
    }
}

/// Transposes the written notes by whole octaves. `Some(0)` cancels a
/// running ottava, so the default is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ottava {
    pub n_octaves: Option<i8>,
}

impl Default for Ottava {
    fn default() -> Self {
        Self { n_octaves: Some(0) }
    }
}

impl Indicator for Ottava {
    fn is_active(&self) -> bool {
        self.n_octaves.is_some()
    }
}

/// Text left of a staff, such as an instrument name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginMarkup {
    pub content: Option<String>,
    pub context: Option<String>,
}

impl Default for MarginMarkup {
    fn default() -> Self {
        Self {
            content: None,
            context: Some("Staff".to_string()),
        }
    }
}

impl Indicator for MarginMarkup {
    fn is_active(&self) -> bool {
        self.content.is_some() && self.context.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    pub content: Option<String>,
    pub direction: Option<Direction>,
}

impl Indicator for Markup {
    fn is_active(&self) -> bool {
        self.content.is_some() && self.direction.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RehearsalMark {
    pub markup: Option<String>,
}

impl Indicator for RehearsalMark {
    fn is_active(&self) -> bool {
        self.markup.is_some()
    }
}

/// Every notation indicator a note can carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotationIndicators {
    pub bar_line: BarLine,
    pub clef: Clef,
    pub ottava: Ottava,
    pub margin_markup: MarginMarkup,
    pub markup: Markup,
    pub rehearsal_mark: RehearsalMark,
}

impl NotationIndicators {
    pub fn indicators(&self) -> [(&'static str, &dyn Indicator); 6] {
        [
            ("bar_line", &self.bar_line),
            ("clef", &self.clef),
            ("ottava", &self.ottava),
            ("margin_markup", &self.margin_markup),
            ("markup", &self.markup),
            ("rehearsal_mark", &self.rehearsal_mark),
        ]
    }

    pub fn active(&self) -> Vec<&'static str> {
        active_names(&self.indicators())
    }
}

fn active_names(indicators: &[(&'static str, &dyn Indicator)]) -> Vec<&'static str> {
    indicators
        .iter()
        .filter(|(_, indicator)| indicator.is_active())
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_playing_indicators_are_inactive() {
        let indicators = PlayingIndicators::default();
        assert!(indicators.active().is_empty());
        // pedal is pressed by default but has no type yet
        assert_eq!(indicators.pedal.pedal_activity, Some(true));
        assert!(!indicators.pedal.is_active());
    }

    #[test]
    fn test_activation() {
        let mut indicators = PlayingIndicators::default();
        indicators.articulation.name = Some(".".to_string());
        indicators.arpeggio.direction = Some(Direction::Up);
        indicators.laissez_vibrer = true;
        assert_eq!(indicators.active(), vec!["articulation", "arpeggio", "laissez_vibrer"]);

        indicators.ornamentation.direction = Some(Direction::Down);
        indicators.ornamentation.n_times = None;
        assert!(!indicators.ornamentation.is_active());
    }

    #[test]
    fn test_default_notation_indicators() {
        let mut indicators = NotationIndicators::default();
        assert_eq!(indicators.active(), vec!["ottava"]);
        assert!(!indicators.margin_markup.is_active());

        indicators.margin_markup.content = Some("Violin".to_string());
        indicators.clef.name = Some("bass".to_string());
        assert_eq!(indicators.active(), vec!["clef", "ottava", "margin_markup"]);
    }

    #[test]
    fn test_hairpin_symbols() {
        let symbols: Vec<String> = [HairpinSymbol::Crescendo, HairpinSymbol::Decrescendo, HairpinSymbol::Stop]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(symbols, vec!["<", ">", "!"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let indicators: PlayingIndicators =
            serde_json::from_str(r#"{"tremolo": {"n_flags": 3}, "tie": true}"#).unwrap();
        assert_eq!(indicators.active(), vec!["tie", "tremolo"]);
        assert_eq!(indicators.ornamentation.n_times, Some(1));
    }
}
