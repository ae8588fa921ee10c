use crate::constraints::room_busy;
use types::{Day, Room, RoomKind, Slot, Subject, WeekGrid};

fn fold(subject: &str) -> String {
    subject
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        })
        .collect()
}

// Keys match whole words. A trailing `*` accepts any word with that stem and
// a key with spaces matches consecutive words.
const GYM: &[&str] = &["physical education", "educacao fisica", "pe", "sport*", "gym*", "martial*"];
const LAB: &[&str] = &[
    "scien*", "cienc*", "biolog*", "chemi*", "quimica", "physics", "fisica", "lab", "laborat*",
    "digital", "comput*", "informatic*", "robot*",
];
const STAGE: &[&str] = &["art", "arts", "artes", "music*", "musica", "theat*", "teatro", "danc*"];

fn key_matches(words: &[&str], key: &str) -> bool {
    let parts: Vec<&str> = key.split(' ').collect();
    words.windows(parts.len()).any(|window| {
        window.iter().zip(&parts).all(|(word, part)| match part.strip_suffix('*') {
            Some(stem) => word.starts_with(stem),
            None => word == part,
        })
    })
}

/// Room kinds a subject is best taught in, most suitable first.
pub fn preferred_kinds(subject: &Subject) -> &'static [RoomKind] {
    let s = fold(&subject.0);
    let words: Vec<&str> = s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let hit = |keys: &[&str]| keys.iter().any(|k| key_matches(&words, k));
    // PE before the lab table: "educacao fisica" contains "fisica".
    if hit(GYM) {
        &[RoomKind::Gymnasium]
    } else if hit(LAB) {
        &[RoomKind::Laboratory]
    } else if hit(STAGE) {
        &[RoomKind::Classroom, RoomKind::Auditorium]
    } else {
        &[RoomKind::Classroom]
    }
}

/// First free room for the period, preferring rooms suited to the subject.
/// `None` leaves the lesson roomless; it never blocks placement.
pub fn allocate_room<'r>(
    grid: &WeekGrid,
    day: Day,
    slot: Slot,
    subject: &Subject,
    rooms: &'r [Room],
) -> Option<&'r Room> {
    let free = |r: &&Room| !room_busy(grid, day, slot, &r.id);
    preferred_kinds(subject)
        .iter()
        .find_map(|kind| rooms.iter().filter(|r| r.kind == *kind).find(free))
        .or_else(|| rooms.iter().find(free))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Lesson;

    fn room(id: &str, kind: RoomKind) -> Room {
        Room {
            id: id.into(),
            name: id.to_string(),
            kind,
            capacity: 40,
        }
    }

    fn occupy(grid: &mut WeekGrid, room: &str, class: &str) {
        grid.insert(Lesson {
            teacher_id: "t".into(),
            subject: "x".into(),
            class_id: class.into(),
            day: 0,
            slot: 0,
            room_id: Some(room.into()),
            locked: false,
        });
    }

    #[test]
    fn subject_table() {
        assert_eq!(preferred_kinds(&"Educação Física".into()), &[RoomKind::Gymnasium]);
        assert_eq!(preferred_kinds(&"Ciências".into()), &[RoomKind::Laboratory]);
        assert_eq!(preferred_kinds(&"Digital Literacy".into()), &[RoomKind::Laboratory]);
        assert_eq!(preferred_kinds(&"Math".into()), &[RoomKind::Classroom]);
        assert_eq!(preferred_kinds(&"Art".into())[1], RoomKind::Auditorium);
        assert_eq!(preferred_kinds(&"PE".into()), &[RoomKind::Gymnasium]);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(preferred_kinds(&"Syllabus Review".into()), &[RoomKind::Classroom]);
        assert_eq!(preferred_kinds(&"Cartography".into()), &[RoomKind::Classroom]);
        assert_eq!(preferred_kinds(&"Martial Arts".into()), &[RoomKind::Gymnasium]);
        assert_eq!(preferred_kinds(&"Visual Arts".into())[1], RoomKind::Auditorium);
        assert_eq!(preferred_kinds(&"Computer Lab".into()), &[RoomKind::Laboratory]);
        assert_eq!(preferred_kinds(&"Organic Chemistry".into()), &[RoomKind::Laboratory]);
        assert_eq!(preferred_kinds(&"Physical Education".into()), &[RoomKind::Gymnasium]);
    }

    #[test]
    fn prefers_matching_kind_then_falls_back() {
        let rooms = vec![room("C1", RoomKind::Classroom), room("L1", RoomKind::Laboratory)];
        let mut g = WeekGrid::new();
        let science: Subject = "Science".into();

        let r = allocate_room(&g, 0, 0, &science, &rooms).unwrap();
        assert_eq!(r.id.0, "L1");

        occupy(&mut g, "L1", "6A");
        let r = allocate_room(&g, 0, 0, &science, &rooms).unwrap();
        assert_eq!(r.id.0, "C1");

        occupy(&mut g, "C1", "6B");
        assert!(allocate_room(&g, 0, 0, &science, &rooms).is_none());
        assert!(allocate_room(&g, 0, 1, &science, &rooms).is_some());
    }

    #[test]
    fn empty_catalog_yields_no_room() {
        assert!(allocate_room(&WeekGrid::new(), 0, 0, &"Math".into(), &[]).is_none());
    }
}
