//! Unit tests for line templates and the upside-down renderer.

#[cfg(test)]
mod line_tests {
    use crate::error::FormatError;
    use crate::instrument::line::*;
    use crate::instrument::upside_down::upside_down;

    fn fields() -> LineFields {
        LineFields::new()
            .with("name", "Dow Jones Futures")
            .with("url", "https://example.com/dow")
            .with("change_word", "grün")
            .with("pct_change", "+1.20%")
            .with("absolute_value", "33,500")
    }

    // ============= fill Tests =============

    #[test]
    fn test_fill_substitutes_fields() {
        let line = fill("* [{name}]({url}) ist **{change_word}**", &fields()).unwrap();
        assert_eq!(line, "* [Dow Jones Futures](https://example.com/dow) ist **grün**");
    }

    #[test]
    fn test_fill_escaped_braces() {
        assert_eq!(fill("{{{pct_change}}}", &fields()).unwrap(), "{+1.20%}");
    }

    #[test]
    fn test_fill_missing_field() {
        assert_eq!(
            fill("{name} {sma_type}", &fields()),
            Err(FormatError::MissingField {
                field: "sma_type".to_string()
            })
        );
    }

    #[test]
    fn test_fill_empty_value() {
        let fields = fields().with("pct_change", "  ");
        assert_eq!(
            fill("mit {pct_change}", &fields),
            Err(FormatError::EmptyValue {
                field: "pct_change".to_string()
            })
        );
    }

    #[test]
    fn test_fill_malformed() {
        assert_eq!(fill("{name", &fields()), Err(FormatError::Malformed { position: 0 }));
        assert_eq!(fill("ab}", &fields()), Err(FormatError::Malformed { position: 2 }));
        assert_eq!(fill("x {} y", &fields()), Err(FormatError::Malformed { position: 2 }));
    }

    // ============= InstrumentLine Tests =============

    #[test]
    fn test_verb_from_plurality() {
        let template = LineTemplate::Standard("{name} {verb}".to_string());
        let singular = InstrumentLine::new(template.clone(), false);
        let plural = InstrumentLine::new(template, true);

        assert_eq!(singular.render(&fields()).unwrap(), "Dow Jones Futures ist");
        assert_eq!(plural.render(&fields()).unwrap(), "Dow Jones Futures sind");
    }

    #[test]
    fn test_explicit_verb_wins() {
        let line = InstrumentLine::new(LineTemplate::Standard("{verb}".to_string()), true);
        assert_eq!(line.render(&fields().with("verb", "war")).unwrap(), "war");
    }

    #[test]
    fn test_reversed_keeps_segment_order() {
        let segments = vec![
            Segment::new("* [", false),
            Segment::new("{name}", true),
            Segment::new("]({url}) ", false),
            Segment::new("ist {change_word}", true),
        ];
        let line = InstrumentLine::new(LineTemplate::Reversed(segments), false);
        let rendered = line.render(&fields()).unwrap();

        let expected = format!(
            "* [{}](https://example.com/dow) {}",
            upside_down("Dow Jones Futures"),
            upside_down("ist grün")
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_unflagged_segments_match_standard_rendering() {
        let parts = ["* [{name}]({url}) ", "{verb} **{change_word}**", ", mit {pct_change}"];
        let standard = InstrumentLine::new(LineTemplate::Standard(parts.concat()), false)
            .render(&fields())
            .unwrap();

        let unflagged = InstrumentLine::new(
            LineTemplate::Reversed(parts.iter().map(|p| Segment::new(*p, false)).collect()),
            false,
        )
        .render(&fields())
        .unwrap();
        assert_eq!(unflagged, standard);

        // Flag only the middle segment: the outer parts still read like the standard line
        let mixed = InstrumentLine::new(
            LineTemplate::Reversed(
                parts
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Segment::new(*p, i == 1))
                    .collect(),
            ),
            false,
        )
        .render(&fields())
        .unwrap();
        assert!(mixed.starts_with("* [Dow Jones Futures](https://example.com/dow) "));
        assert!(mixed.ends_with(", mit +1.20%"));
        assert!(mixed.contains(&upside_down("ist **grün**")));
    }

    #[test]
    fn test_reversed_segment_errors_propagate() {
        let line = InstrumentLine::new(
            LineTemplate::Reversed(vec![Segment::new("{crosses}", true)]),
            false,
        );
        assert!(matches!(
            line.render(&fields()),
            Err(FormatError::MissingField { .. })
        ));
    }

    // ============= LineSpec Tests =============

    #[test]
    fn test_line_spec_shapes() {
        let plain: LineSpec = serde_yaml::from_str("\"* {name}\"").unwrap();
        assert_eq!(plain, LineSpec::Plain("* {name}".to_string()));

        let alternating: LineSpec = serde_yaml::from_str("[\"* [\", \"{name}\", \"]({url})\"]").unwrap();
        assert_eq!(
            LineTemplate::from_spec(&alternating, false),
            LineTemplate::Reversed(vec![
                Segment::new("* [", false),
                Segment::new("{name}", true),
                Segment::new("]({url})", false),
            ])
        );

        let flagged: LineSpec = serde_yaml::from_str(
            "- text: \"* \"\n- text: \"{name}\"\n  reversed: true\n",
        )
        .unwrap();
        assert_eq!(
            LineTemplate::from_spec(&flagged, false),
            LineTemplate::Reversed(vec![Segment::new("* ", false), Segment::new("{name}", true)])
        );
    }

    #[test]
    fn test_forced_reversal_of_plain_template() {
        let spec = LineSpec::Plain("{name}".to_string());
        assert_eq!(
            LineTemplate::from_spec(&spec, true),
            LineTemplate::Reversed(vec![Segment::new("{name}", true)])
        );
        assert_eq!(
            LineTemplate::from_spec(&spec, false),
            LineTemplate::Standard("{name}".to_string())
        );
    }
}
