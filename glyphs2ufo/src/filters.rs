//! Parsing of Glyphs `Filter` custom parameters
//!
//! A filter string looks like `Name;arg;key:value;include:a,b`. The parsed
//! form is what ufo2ft expects under `com.github.googlei18n.ufo2ft.filters`.

use std::sync::OnceLock;

use indexmap::IndexMap;
use log::error;
use regex::Regex;

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<plist::Value>,
    pub kwargs: IndexMap<String, plist::Value>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl Filter {
    /// The lib representation, omitting whatever is unset
    pub fn to_plist(&self) -> plist::Dictionary {
        let mut dict = plist::Dictionary::new();
        dict.insert("name".into(), self.name.clone().into());
        if !self.args.is_empty() {
            dict.insert("args".into(), plist::Value::Array(self.args.clone()));
        }
        if !self.kwargs.is_empty() {
            let kwargs = self
                .kwargs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            dict.insert("kwargs".into(), plist::Value::Dictionary(kwargs));
        }
        for (key, names) in [("include", &self.include), ("exclude", &self.exclude)] {
            if let Some(names) = names {
                let names = names.iter().cloned().map(plist::Value::String).collect();
                dict.insert(key.into(), plist::Value::Array(names));
            }
        }
        dict
    }
}

fn name_list_separator() -> &'static Regex {
    static SEP: OnceLock<Regex> = OnceLock::new();
    SEP.get_or_init(|| Regex::new("[ ,]+").unwrap())
}

/// Parse a Glyphs filter string.
///
/// Returns None, logging an error, if the string doesn't start with a filter name.
pub fn parse_glyphs_filter(filter_str: &str) -> Option<Filter> {
    let mut elements = filter_str.split(';');
    let name = elements.next().unwrap_or_default();
    if name.is_empty() {
        error!("Failed to parse glyphs filter, expecting a filter name: {filter_str}");
        return None;
    }

    let mut filter = Filter {
        name: name.to_string(),
        args: Vec::new(),
        kwargs: IndexMap::new(),
        include: None,
        exclude: None,
    };
    let elements: Vec<_> = elements.collect();
    let last = elements.len().saturating_sub(1);
    for (idx, elem) in elements.into_iter().enumerate() {
        if elem.is_empty() {
            continue;
        }
        let Some((key, value)) = elem.split_once(':') else {
            filter.args.push(cast_to_number_or_bool(elem));
            continue;
        };
        let lower = key.to_lowercase();
        if lower == "include" || lower == "exclude" {
            if idx != last {
                error!(
                    "{key} can only present as the last argument in the filter. {elem} is ignored."
                );
                continue;
            }
            let names = name_list_separator()
                .split(value)
                .map(str::to_string)
                .collect();
            if lower == "include" {
                filter.include = Some(names);
            } else {
                filter.exclude = Some(names);
            }
        } else {
            filter
                .kwargs
                .insert(key.to_string(), cast_to_number_or_bool(value));
        }
    }
    Some(filter)
}

/// `true`/`false` (any case) become booleans, then integers, then reals;
/// anything else stays a string.
pub fn cast_to_number_or_bool(raw: &str) -> plist::Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return plist::Value::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return plist::Value::Boolean(false);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return plist::Value::Integer(int.into());
    }
    if let Ok(real) = trimmed.parse::<f64>() {
        return plist::Value::Real(real);
    }
    plist::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn names(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn parse_args_and_kwargs() {
        let _ = env_logger::builder().is_test(true).try_init();
        let filter = parse_glyphs_filter("Transformations;OffsetX:40;OffsetY:60;include:uni0334,uni0335 uni0336").unwrap();
        assert_eq!("Transformations", filter.name);
        assert!(filter.args.is_empty());
        assert_eq!(
            vec![
                ("OffsetX".to_string(), plist::Value::Integer(40i64.into())),
                ("OffsetY".to_string(), plist::Value::Integer(60i64.into())),
            ],
            filter.kwargs.into_iter().collect::<Vec<_>>()
        );
        assert_eq!(names(&["uni0334", "uni0335", "uni0336"]), filter.include);
        assert_eq!(None, filter.exclude);
    }

    #[test]
    fn parse_positional_args() {
        let filter = parse_glyphs_filter("Roughenizer;34;2;0;0.34").unwrap();
        assert_eq!(
            vec![
                plist::Value::Integer(34i64.into()),
                plist::Value::Integer(2i64.into()),
                plist::Value::Integer(0i64.into()),
                plist::Value::Real(0.34),
            ],
            filter.args
        );
    }

    #[test]
    fn include_must_be_last() {
        let _ = env_logger::builder().is_test(true).try_init();
        let filter = parse_glyphs_filter("Foo;exclude:a;Bar:1").unwrap();
        assert_eq!(None, filter.exclude);
        assert_eq!(1, filter.kwargs.len());
    }

    #[test]
    fn empty_arguments_are_skipped() {
        let filter = parse_glyphs_filter("Foo;;1;").unwrap();
        assert_eq!(vec![plist::Value::Integer(1i64.into())], filter.args);
    }

    #[test]
    fn name_is_required() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert_eq!(None, parse_glyphs_filter(";OffsetX:40"));
        assert_eq!(None, parse_glyphs_filter(""));
    }

    #[test]
    fn plist_omits_unset_parts() {
        let filter = parse_glyphs_filter("Foo;exclude:a b").unwrap();
        let dict = filter.to_plist();
        assert_eq!(
            vec!["name", "exclude"],
            dict.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(
            Some(&plist::Value::Array(vec!["a".into(), "b".into()])),
            dict.get("exclude")
        );
    }

    #[rstest]
    #[case("true", plist::Value::Boolean(true))]
    #[case(" FALSE ", plist::Value::Boolean(false))]
    #[case("42", plist::Value::Integer(42i64.into()))]
    #[case("-7", plist::Value::Integer((-7i64).into()))]
    #[case("1.5", plist::Value::Real(1.5))]
    #[case("abc", plist::Value::String("abc".to_string()))]
    fn casting(#[case] raw: &str, #[case] expected: plist::Value) {
        assert_eq!(expected, cast_to_number_or_bool(raw));
    }
}
