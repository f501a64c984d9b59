//! Batch hydration: full entity rows for ids returned by the engine.
//!
//! Every `find_*` returns rows in the order of the ids it was given, so a
//! sorted page of ids hydrates into a sorted page of entities.

use std::collections::HashMap;

use marquee_core::{Gallery, Gender, Group, Image, Performer, Scene, Studio, Tag};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::clause::{id_args, placeholders};
use crate::error::QueryError;

/// SQLite's default variable limit is well above this.
const BATCH_SIZE: usize = 500;

fn find_by_ids<T: Clone>(
    conn: &Connection,
    entity: &'static str,
    select: &str,
    ids: &[i64],
    id_of: fn(&T) -> i64,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, QueryError> {
    let mut found: HashMap<i64, T> = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(BATCH_SIZE) {
        let sql = format!("{select} WHERE id IN ({})", placeholders(chunk.len()));
        let args: Vec<Value> = id_args(chunk);
        log::trace!("{sql} {args:?}");
        let run = || -> rusqlite::Result<Vec<T>> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), map)?;
            rows.collect()
        };
        for row in run().map_err(|e| QueryError::execution(&sql, &args, e))? {
            found.insert(id_of(&row), row);
        }
    }

    ids.iter()
        .map(|&id| {
            found
                .get(&id)
                .cloned()
                .ok_or(QueryError::NotFound { entity, id })
        })
        .collect()
}

// ── Finders ─────────────────────────────────────────────────────────────────

pub fn find_scenes(conn: &Connection, ids: &[i64]) -> Result<Vec<Scene>, QueryError> {
    find_by_ids(
        conn,
        "scene",
        "SELECT id, title, code, details, director, date, rating, organized,
                studio_id, created_at, updated_at
         FROM scenes",
        ids,
        |s| s.id,
        row_to_scene,
    )
}

pub fn find_images(conn: &Connection, ids: &[i64]) -> Result<Vec<Image>, QueryError> {
    find_by_ids(
        conn,
        "image",
        "SELECT id, title, date, rating, organized, studio_id, created_at, updated_at
         FROM images",
        ids,
        |i| i.id,
        row_to_image,
    )
}

pub fn find_galleries(conn: &Connection, ids: &[i64]) -> Result<Vec<Gallery>, QueryError> {
    find_by_ids(
        conn,
        "gallery",
        "SELECT id, title, details, date, rating, organized, studio_id,
                created_at, updated_at
         FROM galleries",
        ids,
        |g| g.id,
        row_to_gallery,
    )
}

pub fn find_performers(conn: &Connection, ids: &[i64]) -> Result<Vec<Performer>, QueryError> {
    find_by_ids(
        conn,
        "performer",
        "SELECT id, name, disambiguation, gender, birthdate, details, rating,
                favorite, created_at, updated_at
         FROM performers",
        ids,
        |p| p.id,
        row_to_performer,
    )
}

pub fn find_studios(conn: &Connection, ids: &[i64]) -> Result<Vec<Studio>, QueryError> {
    find_by_ids(
        conn,
        "studio",
        "SELECT id, name, url, details, rating, favorite, parent_id,
                created_at, updated_at
         FROM studios",
        ids,
        |s| s.id,
        row_to_studio,
    )
}

pub fn find_tags(conn: &Connection, ids: &[i64]) -> Result<Vec<Tag>, QueryError> {
    find_by_ids(
        conn,
        "tag",
        "SELECT id, name, description, favorite, created_at, updated_at FROM tags",
        ids,
        |t| t.id,
        row_to_tag,
    )
}

pub fn find_groups(conn: &Connection, ids: &[i64]) -> Result<Vec<Group>, QueryError> {
    find_by_ids(
        conn,
        "group",
        "SELECT id, name, director, description, date, rating, duration, studio_id,
                created_at, updated_at
         FROM groups",
        ids,
        |g| g.id,
        row_to_group,
    )
}

// ── Row Mappers ─────────────────────────────────────────────────────────────

fn row_to_scene(row: &rusqlite::Row<'_>) -> rusqlite::Result<Scene> {
    Ok(Scene {
        id: row.get(0)?,
        title: row.get(1)?,
        code: row.get(2)?,
        details: row.get(3)?,
        director: row.get(4)?,
        date: row.get(5)?,
        rating: row.get(6)?,
        organized: row.get(7)?,
        studio_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        rating: row.get(3)?,
        organized: row.get(4)?,
        studio_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_gallery(row: &rusqlite::Row<'_>) -> rusqlite::Result<Gallery> {
    Ok(Gallery {
        id: row.get(0)?,
        title: row.get(1)?,
        details: row.get(2)?,
        date: row.get(3)?,
        rating: row.get(4)?,
        organized: row.get(5)?,
        studio_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_performer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Performer> {
    let gender: Option<String> = row.get(3)?;
    Ok(Performer {
        id: row.get(0)?,
        name: row.get(1)?,
        disambiguation: row.get(2)?,
        gender: gender.and_then(|g| g.parse::<Gender>().ok()),
        birthdate: row.get(4)?,
        details: row.get(5)?,
        rating: row.get(6)?,
        favorite: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn row_to_studio(row: &rusqlite::Row<'_>) -> rusqlite::Result<Studio> {
    Ok(Studio {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        details: row.get(3)?,
        rating: row.get(4)?,
        favorite: row.get(5)?,
        parent_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        favorite: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        director: row.get(2)?,
        synopsis: row.get(3)?,
        date: row.get(4)?,
        rating: row.get(5)?,
        duration: row.get(6)?,
        studio_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
