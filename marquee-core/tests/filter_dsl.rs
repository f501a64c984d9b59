use marquee_core::*;
use serde_json::json;

#[test]
fn scene_filter_from_json() {
    let filter: SceneFilter = serde_json::from_value(json!({
        "title": { "value": "beach", "modifier": "INCLUDES" },
        "tags": { "value": [1, 2], "modifier": "INCLUDES_ALL", "depth": -1 },
        "rating": { "value": 60, "value2": 80, "modifier": "BETWEEN" },
        "organized": true
    }))
    .unwrap();

    let title = filter.title.unwrap();
    assert_eq!(title.modifier, CriterionModifier::Includes);
    assert_eq!(title.value, "beach");

    let tags = filter.tags.unwrap();
    assert_eq!(tags.value, vec![1, 2]);
    assert_eq!(tags.depth, Depth::Unbounded);
    assert!(tags.excludes.is_empty());

    assert_eq!(filter.rating, Some(IntCriterion::between(60, 80)));
    assert_eq!(filter.organized, Some(true));
}

#[test]
fn missing_depth_means_exact() {
    let c: HierarchicalMultiCriterion =
        serde_json::from_value(json!({ "value": [4], "modifier": "INCLUDES" })).unwrap();
    assert!(c.depth.is_exact());
}

#[test]
fn depth_below_minus_one_is_rejected() {
    let result: Result<HierarchicalMultiCriterion, _> =
        serde_json::from_value(json!({ "value": [4], "modifier": "INCLUDES", "depth": -5 }));
    assert!(result.is_err());
}

#[test]
fn unknown_field_is_rejected() {
    let result: Result<TagFilter, _> = serde_json::from_value(json!({ "nmae": {} }));
    assert!(result.is_err());
}

#[test]
fn nested_sub_filters_deserialize() {
    let filter: StudioFilter = serde_json::from_value(json!({
        "name": { "value": "North", "modifier": "EQUALS" },
        "or": {
            "favorite": true,
            "not": { "rating": { "value": 20, "modifier": "LESS_THAN" } }
        }
    }))
    .unwrap();

    let (op, sub) = filter.sub_filter().unwrap();
    assert_eq!(op, Combinator::Or);
    assert_eq!(sub.favorite, Some(true));
    let (op, inner) = sub.sub_filter().unwrap();
    assert_eq!(op, Combinator::Not);
    assert!(inner.rating.is_some());
    assert!(filter.validate_combination().is_ok());
}

#[test]
fn two_combinators_on_one_level_is_invalid() {
    let filter = GalleryFilter {
        and: Some(Box::default()),
        not: Some(Box::default()),
        ..Default::default()
    };
    assert_eq!(
        filter.validate_combination().unwrap_err(),
        ValidationError::IllegalCombination {
            first: Combinator::And,
            second: Combinator::Not,
        }
    );
}

#[test]
fn invalid_combination_is_found_in_nested_level() {
    let inner = PerformerFilter {
        or: Some(Box::default()),
        not: Some(Box::default()),
        ..Default::default()
    };
    let filter = PerformerFilter {
        and: Some(Box::new(inner)),
        ..Default::default()
    };
    assert!(matches!(
        filter.validate_combination(),
        Err(ValidationError::IllegalCombination { .. })
    ));
}

#[test]
fn gender_criterion_values() {
    let filter: PerformerFilter = serde_json::from_value(json!({
        "gender": { "value": ["FEMALE", "NON_BINARY"], "modifier": "INCLUDES" }
    }))
    .unwrap();
    let gender = filter.gender.unwrap();
    assert_eq!(gender.value, vec![Gender::Female, Gender::NonBinary]);
}

#[test]
fn find_filter_from_json() {
    let find: FindFilter = serde_json::from_str(
        r#"{ "q": "sunset", "page": 2, "per_page": 10, "sort": "title", "direction": "desc" }"#,
    )
    .unwrap();
    assert_eq!(find.query_text(), Some("sunset"));
    assert_eq!(find.page(), 2);
    assert_eq!(find.page_size(25), Some(10));
    assert_eq!(find.sort_or("id"), "title");
    assert_eq!(find.direction(), SortDirection::Desc);
}
