//! Kerning: Glyphs group references to UFO groups, with conflict resolution
//!
//! Glyphs lets a glyph-level rule and a class-level rule cover the same pair
//! of glyphs with different values. UFO kerning can't express which one wins
//! for every member, so conflicting class rules are expanded into glyph pairs
//! without the members they disagree on.

use std::collections::HashMap;
use std::fmt::Display;

use glyphs_model::Kerning;
use indexmap::IndexMap;
use log::{debug, warn};
use smol_str::{format_smolstr, SmolStr};

use crate::{
    constants::{KERN1_PREFIX, KERN2_PREFIX, SIDE1_PREFIX, SIDE2_PREFIX},
    error::Error,
};

type Pair = (SmolStr, SmolStr);

/// A single kerning rule, either side may be a group
#[derive(Clone, Debug, PartialEq)]
pub struct KerningRule {
    pub left: SmolStr,
    pub right: SmolStr,
    pub value: f64,
}

impl Display for KerningRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.left, self.right, self.value)
    }
}

/// A glyph pair covered by two rules with different values
#[derive(Clone, Debug, PartialEq)]
pub struct KerningConflict {
    pub pair: Pair,
    /// The rule that applies to `pair`
    pub kept: KerningRule,
    /// The class rule that no longer covers `pair`
    pub dropped: KerningRule,
}

/// What happened while loading kerning, beyond the pairs themselves
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KerningReport {
    /// UFO group names referenced by kerning but not defined
    pub missing_groups: Vec<SmolStr>,
    pub conflicts: Vec<KerningConflict>,
}

/// Class-to-glyph rule; `class_is_left` tells which side the class is on
struct MixedRule {
    class: SmolStr,
    glyph: SmolStr,
    class_is_left: bool,
}

impl MixedRule {
    fn pair_for(&self, member: &str) -> Pair {
        if self.class_is_left {
            (member.into(), self.glyph.clone())
        } else {
            (self.glyph.clone(), member.into())
        }
    }

    fn class_pair(&self) -> Pair {
        self.pair_for(&self.class)
    }
}

fn group_name(side: &str, glyphs_prefix: &str, ufo_prefix: &str) -> Option<SmolStr> {
    side.strip_prefix(glyphs_prefix)
        .filter(|suffix| !suffix.is_empty())
        .map(|suffix| format_smolstr!("{ufo_prefix}{suffix}"))
}

/// Add Glyphs kerning for one master to a UFO.
///
/// Groups must already be present in the UFO; rules referencing an undefined
/// group are dropped with a warning.
pub fn load_kerning(ufo: &mut norad::Font, kerning: &Kerning) -> Result<KerningReport, Error> {
    let style_name = ufo.font_info.style_name.clone().unwrap_or_default();
    let groups: HashMap<&str, Vec<&str>> = ufo
        .groups
        .iter()
        .map(|(name, members)| (name.as_str(), members.iter().map(|m| m.as_str()).collect()))
        .collect();

    let mut report = KerningReport::default();
    let mut pairs: IndexMap<Pair, f64> = IndexMap::new();
    let mut explicit: HashMap<Pair, f64> = HashMap::new();
    let mut mixed_rules = Vec::new();

    for (left, row) in kerning.iter() {
        let (left, left_is_class) = match group_name(left, SIDE1_PREFIX, KERN1_PREFIX) {
            Some(group) if !groups.contains_key(group.as_str()) => {
                warn!("Non-existent glyph class {group} found in kerning rules.");
                report.missing_groups.push(group);
                continue;
            }
            Some(group) => (group, true),
            None => (left.clone(), false),
        };
        for (right, value) in row.iter() {
            let (right, right_is_class) = match group_name(right, SIDE2_PREFIX, KERN2_PREFIX) {
                Some(group) if !groups.contains_key(group.as_str()) => {
                    warn!("Non-existent glyph class {group} found in kerning rules.");
                    report.missing_groups.push(group);
                    continue;
                }
                Some(group) => (group, true),
                None => (right.clone(), false),
            };
            match (left_is_class, right_is_class) {
                (true, false) => mixed_rules.push(MixedRule {
                    class: left.clone(),
                    glyph: right.clone(),
                    class_is_left: true,
                }),
                (false, true) => mixed_rules.push(MixedRule {
                    class: right.clone(),
                    glyph: left.clone(),
                    class_is_left: false,
                }),
                (false, false) => {
                    explicit.insert((left.clone(), right.clone()), *value);
                }
                (true, true) => (),
            }
            pairs.insert((left.clone(), right), *value);
        }
    }

    let mut seen: HashMap<Pair, KerningRule> = HashMap::new();
    for rule in mixed_rules.iter().rev() {
        remove_rule_if_conflict(
            &style_name,
            &groups,
            &explicit,
            &mut pairs,
            &mut seen,
            rule,
            &mut report,
        );
    }

    debug!(
        "'{style_name}' has {} kerning pairs, {} conflicts resolved",
        pairs.len(),
        report.conflicts.len()
    );
    commit_kerning(ufo, pairs)?;
    Ok(report)
}

/// Drop the members of a class rule that disagree with an explicit glyph rule
/// or with a previously processed class rule.
///
/// If any member is dropped the class rule is replaced by glyph rules for
/// the remaining members.
fn remove_rule_if_conflict(
    style_name: &str,
    groups: &HashMap<&str, Vec<&str>>,
    explicit: &HashMap<Pair, f64>,
    pairs: &mut IndexMap<Pair, f64>,
    seen: &mut HashMap<Pair, KerningRule>,
    mixed: &MixedRule,
    report: &mut KerningReport,
) {
    let class_pair = mixed.class_pair();
    let Some(value) = pairs.get(&class_pair).copied() else {
        return;
    };
    let rule = KerningRule {
        left: class_pair.0.clone(),
        right: class_pair.1.clone(),
        value,
    };

    let members = groups.get(mixed.class.as_str()).cloned().unwrap_or_default();
    let mut kept_members = Vec::with_capacity(members.len());
    for member in members.iter() {
        let pair = mixed.pair_for(member);
        let winner = match explicit.get(&pair) {
            Some(explicit_value) if *explicit_value != value => Some(KerningRule {
                left: pair.0.clone(),
                right: pair.1.clone(),
                value: *explicit_value,
            }),
            Some(_) => None,
            None => seen
                .get(&pair)
                .filter(|existing| existing.value != value && !pairs.contains_key(&pair))
                .cloned(),
        };
        match winner {
            Some(kept) => {
                warn!(
                    "Conflicting kerning rules found in {style_name} master for glyph pair \"{}, {}\" ({kept} and {rule}), removing pair from latter rule",
                    pair.0, pair.1
                );
                report.conflicts.push(KerningConflict {
                    pair,
                    kept,
                    dropped: rule.clone(),
                });
            }
            None => {
                kept_members.push(*member);
                seen.insert(pair, rule.clone());
            }
        }
    }

    if kept_members.len() != members.len() {
        pairs.shift_remove(&class_pair);
        for member in kept_members {
            let pair = mixed.pair_for(member);
            if !explicit.contains_key(&pair) {
                pairs.insert(pair, value);
            }
        }
    }
}

fn commit_kerning(ufo: &mut norad::Font, pairs: IndexMap<Pair, f64>) -> Result<(), Error> {
    for ((left, right), value) in pairs {
        let left = norad::Name::new(&left).map_err(|e| Error::invalid_name(&left, e))?;
        let right = norad::Name::new(&right).map_err(|e| Error::invalid_name(&right, e))?;
        ufo.kerning.entry(left).or_default().insert(right, value);
    }
    Ok(())
}

/// Accumulates kerning group membership while glyphs are loaded.
///
/// Nothing is written to a UFO until [`KerningGroups::commit`].
#[derive(Debug, Default)]
pub struct KerningGroups(IndexMap<SmolStr, Vec<SmolStr>>);

impl KerningGroups {
    /// Record the groups of a glyph; the right group is the first kerning
    /// side, the left group the second.
    pub fn add_glyph(&mut self, glyph: &glyphs_model::Glyph) {
        for (prefix, group) in [
            (KERN1_PREFIX, &glyph.right_kerning_group),
            (KERN2_PREFIX, &glyph.left_kerning_group),
        ] {
            let Some(group) = group.as_ref().filter(|g| !g.is_empty()) else {
                continue;
            };
            self.0
                .entry(format_smolstr!("{prefix}{group}"))
                .or_default()
                .push(glyph.name.clone());
        }
    }

    pub fn commit(&self, ufo: &mut norad::Font) -> Result<(), Error> {
        for (name, members) in self.0.iter() {
            let group = norad::Name::new(name).map_err(|e| Error::invalid_name(name, e))?;
            let members = members
                .iter()
                .map(|m| norad::Name::new(m).map_err(|e| Error::invalid_name(m, e)))
                .collect::<Result<Vec<_>, _>>()?;
            ufo.groups.insert(group, members);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use glyphs_model::Glyph;
    use pretty_assertions::assert_eq;

    use super::*;

    fn kerning(rules: &[(&str, &str, f64)]) -> Kerning {
        let mut kerning = Kerning::new();
        for (left, right, value) in rules {
            kerning
                .entry((*left).into())
                .or_default()
                .insert((*right).into(), *value);
        }
        kerning
    }

    fn font_with_groups(groups: &[(&str, &[&str])]) -> norad::Font {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut font = norad::Font::new();
        font.font_info.style_name = Some("Regular".to_string());
        for (name, members) in groups {
            font.groups.insert(
                norad::Name::new(name).unwrap(),
                members.iter().map(|m| norad::Name::new(m).unwrap()).collect(),
            );
        }
        font
    }

    fn flat_kerning(font: &norad::Font) -> Vec<(String, String, f64)> {
        font.kerning
            .iter()
            .flat_map(|(left, row)| {
                row.iter()
                    .map(move |(right, value)| (left.to_string(), right.to_string(), *value))
            })
            .collect()
    }

    fn triples(rules: &[(&str, &str, f64)]) -> Vec<(String, String, f64)> {
        rules
            .iter()
            .map(|(l, r, v)| (l.to_string(), r.to_string(), *v))
            .collect()
    }

    #[test]
    fn groups_are_renamed() {
        let mut font = font_with_groups(&[
            ("public.kern1.A", &["A", "Aacute"]),
            ("public.kern2.V", &["V"]),
        ]);
        let report = load_kerning(
            &mut font,
            &kerning(&[("@MMK_L_A", "@MMK_R_V", -40.0), ("T", "o", -60.0)]),
        )
        .unwrap();
        assert_eq!(KerningReport::default(), report);
        assert_eq!(
            triples(&[("T", "o", -60.0), ("public.kern1.A", "public.kern2.V", -40.0)]),
            flat_kerning(&font)
        );
    }

    #[test]
    fn missing_group_is_skipped() {
        let mut font = font_with_groups(&[("public.kern1.A", &["A"])]);
        let report = load_kerning(
            &mut font,
            &kerning(&[
                ("@MMK_L_A", "@MMK_R_nope", -40.0),
                ("@MMK_L_A", "x", -10.0),
                ("@MMK_L_missing", "x", -20.0),
            ]),
        )
        .unwrap();
        assert_eq!(
            vec![SmolStr::new("public.kern2.nope"), SmolStr::new("public.kern1.missing")],
            report.missing_groups
        );
        assert_eq!(triples(&[("public.kern1.A", "x", -10.0)]), flat_kerning(&font));
    }

    #[test]
    fn explicit_pair_wins_over_class() {
        let mut font = font_with_groups(&[("public.kern1.A", &["a", "aa"])]);
        let report = load_kerning(
            &mut font,
            &kerning(&[("@MMK_L_A", "x", 10.0), ("aa", "x", 20.0)]),
        )
        .unwrap();
        assert_eq!(
            triples(&[("a", "x", 10.0), ("aa", "x", 20.0)]),
            flat_kerning(&font)
        );
        assert_eq!(1, report.conflicts.len());
        let conflict = &report.conflicts[0];
        assert_eq!((SmolStr::new("aa"), SmolStr::new("x")), conflict.pair);
        assert_eq!(20.0, conflict.kept.value);
        assert_eq!("public.kern1.A", conflict.dropped.left);
    }

    #[test]
    fn agreeing_explicit_pair_is_not_a_conflict() {
        let mut font = font_with_groups(&[("public.kern1.A", &["a", "aa"])]);
        let report = load_kerning(
            &mut font,
            &kerning(&[("@MMK_L_A", "x", 10.0), ("aa", "x", 10.0)]),
        )
        .unwrap();
        assert!(report.conflicts.is_empty());
        assert_eq!(
            triples(&[("aa", "x", 10.0), ("public.kern1.A", "x", 10.0)]),
            flat_kerning(&font)
        );
    }

    #[test]
    fn overlapping_classes_conflict() {
        // 'a' is in a left class and a right class; (a, a) is covered by both
        // mixed rules with different values. The later rule is processed
        // first and keeps the pair.
        let mut font = font_with_groups(&[
            ("public.kern1.A", &["a", "b"]),
            ("public.kern2.A", &["a"]),
        ]);
        let report = load_kerning(
            &mut font,
            &kerning(&[("@MMK_L_A", "a", -10.0), ("a", "@MMK_R_A", -30.0)]),
        )
        .unwrap();
        assert_eq!(1, report.conflicts.len());
        assert_eq!(-30.0, report.conflicts[0].kept.value);
        assert_eq!(-10.0, report.conflicts[0].dropped.value);
        assert_eq!(
            triples(&[
                ("a", "public.kern2.A", -30.0),
                ("b", "a", -10.0),
            ]),
            flat_kerning(&font)
        );
    }

    #[test]
    fn last_of_several_class_rules_keeps_the_pair() {
        // (a, x) is covered by three class rules; the last one in input order
        // keeps it, the other two lose 'a' and become glyph rules
        let mut font = font_with_groups(&[
            ("public.kern1.A", &["a", "aa"]),
            ("public.kern1.B", &["a", "ab"]),
            ("public.kern1.C", &["a", "ac"]),
        ]);
        let report = load_kerning(
            &mut font,
            &kerning(&[
                ("@MMK_L_A", "x", 10.0),
                ("@MMK_L_B", "x", 20.0),
                ("@MMK_L_C", "x", 30.0),
            ]),
        )
        .unwrap();
        assert_eq!(
            triples(&[
                ("aa", "x", 10.0),
                ("ab", "x", 20.0),
                ("public.kern1.C", "x", 30.0),
            ]),
            flat_kerning(&font)
        );
        // one warning per dropped rule
        assert_eq!(2, report.conflicts.len());
        let dropped_rules = ["public.kern1.B", "public.kern1.A"];
        for (conflict, dropped) in report.conflicts.iter().zip(dropped_rules) {
            assert_eq!((SmolStr::new("a"), SmolStr::new("x")), conflict.pair);
            assert_eq!("public.kern1.C", conflict.kept.left);
            assert_eq!(30.0, conflict.kept.value);
            assert_eq!(dropped, conflict.dropped.left);
        }
    }

    #[test]
    fn groups_from_glyphs() {
        let mut a = Glyph::new("a");
        a.right_kerning_group = Some("a".into());
        a.left_kerning_group = Some("o".into());
        let mut o = Glyph::new("o");
        o.left_kerning_group = Some("o".into());
        o.right_kerning_group = Some("".into());

        let mut groups = KerningGroups::default();
        groups.add_glyph(&a);
        groups.add_glyph(&o);
        assert_eq!(2, groups.len());

        let mut font = norad::Font::new();
        groups.commit(&mut font).unwrap();
        let committed: Vec<_> = font
            .groups
            .iter()
            .map(|(name, members)| {
                (
                    name.to_string(),
                    members.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
                )
            })
            .collect();
        assert_eq!(
            vec![
                ("public.kern1.a".to_string(), vec!["a".to_string()]),
                (
                    "public.kern2.o".to_string(),
                    vec!["a".to_string(), "o".to_string()]
                ),
            ],
            committed
        );
    }
}
