use marquee_core::*;
use marquee_db::*;
use rusqlite::Connection;

/// A small library covering every relation the readers touch.
///
/// Tags: Outdoor(1) > Beach(2) > Sunset(3), Indoor(4), and Loop A(5) and
/// Loop B(6) parenting each other. Studios: Northwind(1) > Northwind
/// East(2), Solo(3). Groups: Series(1) > Season One(2) > Episode Pack(3).
fn setup_db() -> Connection {
    let conn = open_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tags (id, name) VALUES
            (1, 'Outdoor'), (2, 'Beach'), (3, 'Sunset'), (4, 'Indoor'),
            (5, 'Loop A'), (6, 'Loop B');
         INSERT INTO tags_relations (parent_id, child_id) VALUES
            (1, 2), (2, 3), (5, 6), (6, 5);
         INSERT INTO tag_aliases (tag_id, alias) VALUES (2, 'Seaside');

         INSERT INTO studios (id, name, parent_id) VALUES
            (1, 'Northwind', NULL), (2, 'Northwind East', 1), (3, 'Solo', NULL);

         INSERT INTO performers (id, name, gender) VALUES
            (1, 'Alice', 'FEMALE'), (2, 'Bob', 'MALE'), (3, 'Cara', NULL);
         INSERT INTO performer_aliases (performer_id, alias) VALUES (1, 'Ally');
         INSERT INTO performers_tags (performer_id, tag_id) VALUES (1, 2);

         INSERT INTO scenes (id, title, date, rating, studio_id) VALUES
            (1, 'Morning Swim', '2024-01-05', 80, 2),
            (2, 'City Walk', '2023-06-01', 40, 3),
            (3, 'Hill Top', NULL, NULL, 1),
            (4, 'Untitled', NULL, NULL, NULL),
            (5, 'Loop', NULL, NULL, NULL);
         INSERT INTO scenes_tags (scene_id, tag_id) VALUES (1, 3), (2, 4), (3, 1), (5, 6);
         INSERT INTO scenes_performers (scene_id, performer_id) VALUES
            (1, 1), (2, 2), (3, 1), (3, 2);
         INSERT INTO scene_files (scene_id, folder, basename, duration, width, height) VALUES
            (1, '/media/beach', 'morning.mp4', 90.4, 1920, 1080),
            (1, '/media/beach', 'morning-alt.mp4', 30.0, 640, 360),
            (2, '/media/city', 'walk.mkv', 600.6, 1280, 720);

         INSERT INTO groups (id, name) VALUES
            (1, 'Series'), (2, 'Season One'), (3, 'Episode Pack');
         INSERT INTO groups_relations (containing_id, sub_id) VALUES (1, 2), (2, 3);
         INSERT INTO scenes_groups (scene_id, group_id) VALUES (1, 3), (2, 2);

         INSERT INTO images (id, title, studio_id) VALUES (1, 'Shore', NULL), (2, 'Street', 3);
         INSERT INTO images_tags (image_id, tag_id) VALUES (1, 2);
         INSERT INTO images_performers (image_id, performer_id) VALUES (1, 1);

         INSERT INTO galleries (id, title) VALUES (1, 'Holiday'), (2, 'Empty');
         INSERT INTO galleries_images (gallery_id, image_id) VALUES (1, 1), (1, 2);
         INSERT INTO scenes_galleries (scene_id, gallery_id) VALUES (1, 1);",
    )
    .unwrap();
    conn
}

fn by_id() -> FindFilter {
    FindFilter::new().with_sort("id", SortDirection::Asc)
}

fn ids<F: EntityFilter>(conn: &Connection, filter: &F) -> Vec<i64> {
    query_ids(conn, &QueryConfig::default(), Some(filter), &by_id())
        .unwrap()
        .ids
}

fn error_of<F: EntityFilter>(conn: &Connection, filter: &F) -> ValidationError {
    query_ids(conn, &QueryConfig::default(), Some(filter), &by_id())
        .unwrap_err()
        .as_validation()
        .cloned()
        .unwrap()
}

fn tree(modifier: CriterionModifier, value: Vec<i64>, depth: Depth) -> HierarchicalMultiCriterion {
    HierarchicalMultiCriterion::new(modifier, value, depth)
}

fn includes(value: Vec<i64>, depth: Depth) -> Option<HierarchicalMultiCriterion> {
    Some(tree(CriterionModifier::Includes, value, depth))
}

// ── Hierarchy depth ─────────────────────────────────────────────────────────

#[test]
fn scene_tags_exact_depth() {
    let conn = setup_db();
    let filter = SceneFilter {
        tags: includes(vec![1], Depth::EXACT),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3]);
}

#[test]
fn scene_tags_bounded_depth() {
    let conn = setup_db();
    let one = SceneFilter {
        tags: includes(vec![1], Depth::Levels(1)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &one), vec![3]);

    let two = SceneFilter {
        tags: includes(vec![1], Depth::Levels(2)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &two), vec![1, 3]);
}

#[test]
fn scene_tags_unbounded_depth() {
    let conn = setup_db();
    let filter = SceneFilter {
        tags: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 3]);
}

#[test]
fn cyclic_tags_terminate() {
    let conn = setup_db();
    let filter = SceneFilter {
        tags: includes(vec![5], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![5]);
}

#[test]
fn scene_tags_include_all_per_root() {
    let conn = setup_db();
    // Hill Top only carries Outdoor, which sits above Beach.
    let filter = SceneFilter {
        tags: Some(tree(CriterionModifier::IncludesAll, vec![1, 2], Depth::Unbounded)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);
}

#[test]
fn studio_excludes_expand_like_values() {
    let conn = setup_db();
    let mut studios = tree(CriterionModifier::Includes, vec![1], Depth::Unbounded);
    let filter = SceneFilter {
        studios: Some(studios.clone()),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 3]);

    studios.excludes = vec![2];
    let filter = SceneFilter {
        studios: Some(studios),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3]);
}

#[test]
fn hierarchical_equals_is_rejected() {
    let conn = setup_db();
    let filter = SceneFilter {
        tags: Some(tree(CriterionModifier::Equals, vec![1], Depth::EXACT)),
        ..Default::default()
    };
    assert!(matches!(
        error_of(&conn, &filter),
        ValidationError::UnsupportedModifier { .. }
    ));
}

// ── Membership ──────────────────────────────────────────────────────────────

#[test]
fn tag_parents_are_strict() {
    let conn = setup_db();
    let direct = TagFilter {
        parents: includes(vec![1], Depth::EXACT),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &direct), vec![2]);

    let all = TagFilter {
        parents: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &all), vec![2, 3]);
}

#[test]
fn tag_children_walk_upwards() {
    let conn = setup_db();
    let filter = TagFilter {
        children: includes(vec![3], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 2]);
}

#[test]
fn tag_in_a_cycle_is_its_own_descendant() {
    let conn = setup_db();
    let filter = TagFilter {
        parents: includes(vec![5], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![5, 6]);
}

#[test]
fn tags_without_parents() {
    let conn = setup_db();
    let filter = TagFilter {
        parents: Some(tree(CriterionModifier::IsNull, vec![], Depth::EXACT)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 4]);
}

#[test]
fn group_containment() {
    let conn = setup_db();
    let contained = GroupFilter {
        containing_groups: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &contained), vec![2, 3]);

    let direct_parents = GroupFilter {
        sub_groups: includes(vec![3], Depth::EXACT),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &direct_parents), vec![2]);
}

// ── Relations two hops away ─────────────────────────────────────────────────

#[test]
fn scene_performer_tags() {
    let conn = setup_db();
    let filter = SceneFilter {
        performer_tags: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 3]);
}

#[test]
fn performer_studios_through_scenes() {
    let conn = setup_db();
    let northwind = PerformerFilter {
        studios: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &northwind), vec![1, 2]);

    let solo = PerformerFilter {
        studios: includes(vec![3], Depth::EXACT),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &solo), vec![2]);
}

#[test]
fn group_performers_through_scenes() {
    let conn = setup_db();
    let filter = GroupFilter {
        performers: Some(MultiCriterion::new(CriterionModifier::Includes, vec![1])),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3]);
}

// ── Scalars, counts and missing fields ──────────────────────────────────────

#[test]
fn scene_performers_include_all() {
    let conn = setup_db();
    let filter = SceneFilter {
        performers: Some(MultiCriterion::new(CriterionModifier::IncludesAll, vec![1, 2])),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3]);
}

#[test]
fn scene_date_between() {
    let conn = setup_db();
    let filter = SceneFilter {
        date: Some(DateCriterion {
            value: "2023-01-01".into(),
            value2: Some("2023-12-31".into()),
            modifier: CriterionModifier::Between,
        }),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![2]);
}

#[test]
fn scene_is_missing_studio() {
    let conn = setup_db();
    let filter = SceneFilter {
        is_missing: Some("studio".into()),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![4, 5]);
}

#[test]
fn unknown_missing_field_is_rejected() {
    let conn = setup_db();
    let filter = SceneFilter {
        is_missing: Some("colour".into()),
        ..Default::default()
    };
    assert_eq!(
        error_of(&conn, &filter),
        ValidationError::UnknownMissingField("colour".into())
    );
}

// ── Scene files ─────────────────────────────────────────────────────────────

#[test]
fn scene_path_words_and_regex() {
    let conn = setup_db();
    let filter = SceneFilter {
        path: Some(StringCriterion::new(CriterionModifier::Includes, "beach walk")),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 2]);

    // Scenes without files have no path to compare against.
    let filter = SceneFilter {
        path: Some(StringCriterion::new(CriterionModifier::Excludes, "beach")),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![2]);

    let filter = SceneFilter {
        path: Some(StringCriterion::new(
            CriterionModifier::MatchesRegex,
            r"^/media/city/.*\.mkv$",
        )),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![2]);
}

#[test]
fn scene_duration_and_resolution() {
    let conn = setup_db();
    // Any file may satisfy the criterion.
    let filter = SceneFilter {
        duration: Some(IntCriterion::new(CriterionModifier::LessThan, 60)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);

    let filter = SceneFilter {
        duration: Some(IntCriterion::new(CriterionModifier::Equals, 601)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![2]);

    let filter = SceneFilter {
        resolution: Some(IntCriterion::new(CriterionModifier::GreaterThan, 720)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);
}

#[test]
fn scene_file_count_and_missing_files() {
    let conn = setup_db();
    let filter = SceneFilter {
        file_count: Some(IntCriterion::new(CriterionModifier::GreaterThan, 1)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);

    let filter = SceneFilter {
        is_missing: Some("files".into()),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3, 4, 5]);
}

#[test]
fn scenes_sort_by_duration() {
    let conn = setup_db();
    let filter = SceneFilter {
        file_count: Some(IntCriterion::new(CriterionModifier::GreaterThan, 0)),
        ..Default::default()
    };
    let find = FindFilter::new().with_sort("duration", SortDirection::Desc);
    let result = query_ids(&conn, &QueryConfig::default(), Some(&filter), &find).unwrap();
    assert_eq!(result.ids, vec![2, 1]);
}

#[test]
fn performer_counts() {
    let conn = setup_db();
    let filter = PerformerFilter {
        scene_count: Some(IntCriterion::new(CriterionModifier::Equals, 0)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![3]);
}

#[test]
fn studio_children_and_parents() {
    let conn = setup_db();
    let with_children = StudioFilter {
        child_count: Some(IntCriterion::new(CriterionModifier::GreaterThan, 0)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &with_children), vec![1]);

    let under_northwind = StudioFilter {
        parents: Some(MultiCriterion::new(CriterionModifier::Includes, vec![1])),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &under_northwind), vec![2]);
}

#[test]
fn gallery_image_count_and_scenes() {
    let conn = setup_db();
    let filter = GalleryFilter {
        image_count: Some(IntCriterion::new(CriterionModifier::Equals, 2)),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);

    let filter = GalleryFilter {
        scenes_filter: Some(Box::new(SceneFilter {
            title: Some(StringCriterion::new(CriterionModifier::Includes, "swim")),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);
}

#[test]
fn image_galleries_and_tags() {
    let conn = setup_db();
    let filter = ImageFilter {
        galleries: Some(MultiCriterion::new(CriterionModifier::Includes, vec![1])),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 2]);

    let filter = ImageFilter {
        tags: includes(vec![1], Depth::Unbounded),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1]);
}

// ── Sub-filters ─────────────────────────────────────────────────────────────

#[test]
fn scene_related_filters() {
    let conn = setup_db();
    let by_tag = SceneFilter {
        tags_filter: Some(Box::new(TagFilter {
            name: Some(StringCriterion::new(CriterionModifier::Equals, "Indoor")),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &by_tag), vec![2]);

    let by_studio = SceneFilter {
        studios_filter: Some(Box::new(StudioFilter {
            name: Some(StringCriterion::new(CriterionModifier::Includes, "Northwind")),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &by_studio), vec![1, 3]);
}

#[test]
fn or_sub_filter() {
    let conn = setup_db();
    let filter = SceneFilter {
        rating: Some(IntCriterion::new(CriterionModifier::GreaterThan, 50)),
        or: Some(Box::new(SceneFilter {
            is_missing: Some("studio".into()),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert_eq!(ids(&conn, &filter), vec![1, 4, 5]);
}

#[test]
fn two_combinators_on_one_level_are_rejected() {
    let conn = setup_db();
    let filter = SceneFilter {
        and: Some(Box::default()),
        not: Some(Box::default()),
        ..Default::default()
    };
    assert_eq!(
        error_of(&conn, &filter),
        ValidationError::IllegalCombination {
            first: Combinator::And,
            second: Combinator::Not,
        }
    );
}

#[test]
fn bad_regex_in_related_filter() {
    let conn = setup_db();
    let filter = SceneFilter {
        tags_filter: Some(Box::new(TagFilter {
            name: Some(StringCriterion::new(CriterionModifier::MatchesRegex, "(")),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert!(matches!(
        error_of(&conn, &filter),
        ValidationError::InvalidRegex { .. }
    ));
}

// ── Readers ─────────────────────────────────────────────────────────────────

#[test]
fn scenes_hydrate_in_sort_order() {
    let conn = setup_db();
    let find = FindFilter::new().with_page(1, 3);
    let (scenes, count) = query_scenes(&conn, &QueryConfig::default(), None, &find).unwrap();
    let titles: Vec<_> = scenes.iter().filter_map(|s| s.title.as_deref()).collect();
    assert_eq!(titles, vec!["City Walk", "Hill Top", "Loop"]);
    assert_eq!(count, 5);
}

#[test]
fn scene_search_text() {
    let conn = setup_db();
    let find = FindFilter::new().with_q("swim");
    let (scenes, count) = query_scenes(&conn, &QueryConfig::default(), None, &find).unwrap();
    assert_eq!(count, 1);
    assert_eq!(scenes[0].id, 1);
}

#[test]
fn performer_gender_and_alias_search() {
    let conn = setup_db();
    let config = QueryConfig::default();
    let filter = PerformerFilter {
        gender: Some(EnumCriterion::new(CriterionModifier::Includes, vec![Gender::Female])),
        ..Default::default()
    };
    let (performers, _) = query_performers(&conn, &config, Some(&filter), &by_id()).unwrap();
    assert_eq!(performers.len(), 1);
    assert_eq!(performers[0].gender, Some(Gender::Female));

    let find = FindFilter::new().with_q("ally");
    let (performers, count) = query_performers(&conn, &config, None, &find).unwrap();
    assert_eq!(count, 1);
    assert_eq!(performers[0].name, "Alice");
}

#[test]
fn tag_alias_search() {
    let conn = setup_db();
    let find = FindFilter::new().with_q("seaside");
    let (tags, count) = query_tags(&conn, &QueryConfig::default(), None, &find).unwrap();
    assert_eq!(count, 1);
    assert_eq!(tags[0].name, "Beach");
}

#[test]
fn every_reader_runs_unfiltered() {
    let conn = setup_db();
    let config = QueryConfig::default();
    let all = FindFilter::new().unpaginated();

    assert_eq!(query_scenes(&conn, &config, None, &all).unwrap().1, 5);
    assert_eq!(query_images(&conn, &config, None, &all).unwrap().1, 2);
    assert_eq!(query_galleries(&conn, &config, None, &all).unwrap().1, 2);
    assert_eq!(query_performers(&conn, &config, None, &all).unwrap().1, 3);
    assert_eq!(query_studios(&conn, &config, None, &all).unwrap().1, 3);
    assert_eq!(query_tags(&conn, &config, None, &all).unwrap().1, 6);

    let (groups, count) = query_groups(&conn, &config, None, &all).unwrap();
    assert_eq!(count, 3);
    let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Episode Pack", "Season One", "Series"]);
}
