use std::io::{self, Write};

use chrono::NaiveDate;
use class_calendar::persistence::{export_offset_csv, parse_date_text};
use class_calendar::{
    AssignmentOverride, JsonFileStore, KeyValueStore, MemoryStore, MoveStatus, OffsetItem,
    Planner, PlannerConfig, TemplateFilter,
};
use tracing_subscriber::EnvFilter;

type CliPlanner = Planner<Box<dyn KeyValueStore>>;

fn render_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut cells = cells;
    let mut line = String::from("|");
    for width in widths {
        let cell = cells.next().unwrap_or("");
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if ci < widths.len() && cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_date_text(s).ok().flatten()
}

fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Course ids contain spaces, so `FM4103` and `fm-4103` name `FM 4103`.
fn resolve_course(planner: &CliPlanner, token: &str) -> Option<String> {
    let wanted = normalize_id(token);
    planner
        .courses()
        .iter()
        .find(|course| normalize_id(&course.id) == wanted)
        .map(|course| course.id.clone())
}

fn print_help() {
    println!(
        "Commands:\n  help                                        Show this help\n  courses                                     List configured courses\n  import <course> <assignments.csv> <meetings.csv>\n                                              Load a course calendar from CSV\n  show <course>                               Show the stored calendar\n  classday <course> <date>                    Class-day number of a date\n  offset <course> [date] [export <a.csv> <m.csv>]\n                                              Plan the calendar onto a new start\n  accept <course> [date]                      Plan and store as accepted future\n  move <course> <from> <to> [description...]  Cascade-move a class meeting\n  edit <course> <start|due> <date> <name...> [@ <time...>]\n                                              Override an assignment date\n  copy <from-course> <to-course>              Copy assignments onto another course\n  holidays <year>                             Show the holiday table\n  clear <course> <start> <end>                Remove items dated in a range\n  clear-semester <course> [date]              Remove items in a whole semester\n  templates                                   List saved templates\n  template-save <course> <name...>            Save a calendar as a template\n  template-apply <template> <course>          Replace a calendar with a template\n  template-delete <template>                  Remove a template\n  quit|exit                                   Exit\n\nCourse ids may be written without spaces (FM4103). Dates are YYYY-MM-DD or MM-DD-YYYY.\nWithout a date, offset and accept use the suggested start of the next semester."
    );
}

fn build_planner() -> Result<CliPlanner, String> {
    let config = PlannerConfig::from_env().map_err(|e| format!("config error: {e}"))?;
    let store: Box<dyn KeyValueStore> = match &config.store_path {
        Some(path) => Box::new(JsonFileStore::new(path.clone())),
        None => Box::new(MemoryStore::new()),
    };
    Ok(Planner::new(store, config))
}

fn show_calendar(planner: &CliPlanner, course_id: &str) {
    match planner.load_calendar(course_id) {
        Ok(Some(calendar)) => {
            let assignment_rows: Vec<Vec<String>> = calendar
                .assignments
                .iter()
                .chain(calendar.accepted_future.iter())
                .map(|a| {
                    vec![
                        a.name.clone(),
                        fmt_date(a.start_date),
                        a.start_time.clone().unwrap_or_default(),
                        fmt_date(a.due_date),
                        a.due_time.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            let meeting_rows: Vec<Vec<String>> = calendar
                .meetings
                .iter()
                .map(|m| {
                    vec![
                        m.date.to_string(),
                        m.kind().as_str().to_string(),
                        m.description.clone(),
                    ]
                })
                .collect();
            println!(
                "{}",
                render_text_table(
                    &["Item Name", "Start Date", "Start Time", "Due Date", "Due Time"],
                    &assignment_rows
                )
            );
            println!(
                "{}",
                render_text_table(&["Date", "Kind", "Description"], &meeting_rows)
            );
        }
        Ok(None) => println!("No calendar stored for {course_id}."),
        Err(e) => println!("Error: {e}"),
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("class_calendar=info")),
        )
        .with_writer(io::stderr)
        .try_init();

    let mut planner = match build_planner() {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!("Class Calendar (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "courses" => {
                let stored = planner.stored_course_ids().unwrap_or_default();
                let rows: Vec<Vec<String>> = planner
                    .courses()
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.clone(),
                            c.schedule.clone(),
                            c.pattern().map(|p| p.to_string()).unwrap_or_else(|_| "?".into()),
                            if stored.contains(&c.id) { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    render_text_table(&["Course", "Schedule", "Pattern", "Stored"], &rows)
                );
            }
            "import" => match (parts.next(), parts.next(), parts.next()) {
                (Some(course), Some(a_path), Some(m_path)) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    match planner.import_csv(&course_id, a_path, m_path) {
                        Ok(calendar) => println!(
                            "Imported {} assignments and {} meetings for {}.",
                            calendar.assignments.len(),
                            calendar.meetings.len(),
                            course_id
                        ),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: import <course> <assignments.csv> <meetings.csv>"),
            },
            "show" => match parts.next() {
                Some(course) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    show_calendar(&planner, &course_id);
                }
                None => println!("Usage: show <course>"),
            },
            "classday" => match (parts.next(), parts.next()) {
                (Some(course), Some(date_s)) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    let Some(date) = parse_date(date_s) else {
                        println!("Invalid date (YYYY-MM-DD)");
                        continue;
                    };
                    match planner.class_day(&course_id, date) {
                        Ok(Some(n)) => println!("{date} is class day {n} for {course_id}."),
                        Ok(None) => println!("{date} is not a class day for {course_id}."),
                        Err(e) => println!("Error: {e}"),
                    }
                    if let Some(label) = planner.holiday_label(date) {
                        println!("{date} is a holiday: {label}.");
                    }
                }
                _ => println!("Usage: classday <course> <date>"),
            },
            "offset" | "accept" => {
                let args: Vec<&str> = parts.collect();
                let Some(course) = args.first() else {
                    println!("Usage: {cmd} <course> [date]");
                    continue;
                };
                let Some(course_id) = resolve_course(&planner, course) else {
                    println!("Unknown course {course}");
                    continue;
                };
                let mut rest = &args[1..];
                let target_start = match rest.first().and_then(|s| parse_date(s)) {
                    Some(date) => {
                        rest = &rest[1..];
                        date
                    }
                    None if rest.first().is_none_or(|s| *s == "export") => {
                        match planner.suggested_target_start(&course_id) {
                            Ok(date) => {
                                println!("Using suggested start {date}.");
                                date
                            }
                            Err(e) => {
                                println!("Error: {e}");
                                continue;
                            }
                        }
                    }
                    None => {
                        println!("Invalid date (YYYY-MM-DD)");
                        continue;
                    }
                };
                let planned = match planner.plan_future(&course_id, target_start) {
                    Ok(planned) => planned,
                    Err(e) => {
                        println!("Error: {e}");
                        continue;
                    }
                };
                if cmd == "accept" {
                    match planner.accept_future(&course_id, &planned) {
                        Ok(n) => println!("Accepted {n} future assignments for {course_id}."),
                        Err(e) => println!("Error: {e}"),
                    }
                    continue;
                }
                let rows: Vec<Vec<String>> = planned
                    .items
                    .iter()
                    .map(|item| match item {
                        OffsetItem::Assignment(a) => vec![
                            "assignment".to_string(),
                            a.name.clone(),
                            fmt_date(a.start_date),
                            fmt_date(a.due_date),
                        ],
                        OffsetItem::ClassMeeting(m) => vec![
                            "meeting".to_string(),
                            m.description.clone(),
                            m.date.to_string(),
                            String::new(),
                        ],
                    })
                    .collect();
                println!(
                    "Planned {} items for {} starting {}.",
                    planned.items.len(),
                    course_id,
                    planned.summary.target_epoch
                );
                if planned.degraded() {
                    println!(
                        "Warning: {} dates could not skip every holiday.",
                        planned.summary.degraded_count
                    );
                }
                println!(
                    "{}",
                    render_text_table(&["Kind", "Name", "Start/Date", "Due"], &rows)
                );
                match rest {
                    ["export", a_path, m_path] => {
                        match export_offset_csv(&planned, a_path, m_path) {
                            Ok(()) => println!("Exported to {a_path} and {m_path}."),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    [] => {}
                    _ => println!("Usage: offset <course> [date] [export <a.csv> <m.csv>]"),
                }
            }
            "move" => match (parts.next(), parts.next(), parts.next()) {
                (Some(course), Some(from_s), Some(to_s)) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    let (Some(from), Some(to)) = (parse_date(from_s), parse_date(to_s)) else {
                        println!("Invalid date (YYYY-MM-DD)");
                        continue;
                    };
                    let rest: Vec<&str> = parts.collect();
                    let key = if rest.is_empty() { None } else { Some(rest.join(" ")) };
                    match planner.move_meeting(&course_id, from, to, key.as_deref()) {
                        Ok(outcome) => {
                            match outcome.status {
                                MoveStatus::Moved => println!(
                                    "Moved {} meetings.",
                                    outcome.relocations.len()
                                ),
                                MoveStatus::Unchanged => println!("Nothing to move."),
                                MoveStatus::NotFound => {
                                    println!("No movable meeting on {from}.")
                                }
                                MoveStatus::Exhausted => println!(
                                    "Could not place every displaced meeting; saved the best placement."
                                ),
                            }
                            for r in &outcome.relocations {
                                println!("  {}: {} -> {}", r.description, r.from, r.to);
                            }
                        }
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: move <course> <from> <to> [description...]"),
            },
            "holidays" => match parts.next().map(str::parse::<i32>) {
                Some(Ok(year)) => {
                    let table = planner.holidays(year);
                    let rows: Vec<Vec<String>> = table
                        .records()
                        .iter()
                        .map(|record| {
                            let dates = record.dates();
                            vec![
                                record.label.clone(),
                                fmt_date(dates.first().copied()),
                                fmt_date(dates.last().copied()),
                            ]
                        })
                        .collect();
                    println!("{}", render_text_table(&["Holiday", "From", "To"], &rows));
                }
                Some(Err(_)) => println!("Invalid year"),
                None => println!("Usage: holidays <year>"),
            },
            "clear" => match (parts.next(), parts.next(), parts.next()) {
                (Some(course), Some(start_s), Some(end_s)) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    let (Some(start), Some(end)) = (parse_date(start_s), parse_date(end_s)) else {
                        println!("Invalid date (YYYY-MM-DD)");
                        continue;
                    };
                    match planner.clear_range(&course_id, start, end) {
                        Ok(n) => println!("Removed {n} items from {course_id}."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: clear <course> <start> <end>"),
            },
            "clear-semester" => match parts.next() {
                Some(course) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    let containing = match parts.next() {
                        Some(date_s) => match parse_date(date_s) {
                            Some(date) => Some(date),
                            None => {
                                println!("Invalid date (YYYY-MM-DD)");
                                continue;
                            }
                        },
                        None => None,
                    };
                    match planner.clear_semester(&course_id, containing) {
                        Ok((semester, n)) => {
                            println!("Removed {n} items from {course_id} ({semester}).")
                        }
                        Err(e) => println!("Error: {e}"),
                    }
                }
                None => println!("Usage: clear-semester <course> [date]"),
            },
            "edit" => {
                let args: Vec<&str> = parts.collect();
                let [course, field, date_s, rest @ ..] = args.as_slice() else {
                    println!("Usage: edit <course> <start|due> <date> <name...> [@ <time...>]");
                    continue;
                };
                let Some(course_id) = resolve_course(&planner, course) else {
                    println!("Unknown course {course}");
                    continue;
                };
                let Some(date) = parse_date(date_s) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                let (name, time) = match rest.iter().position(|token| *token == "@") {
                    Some(at) => (rest[..at].join(" "), Some(rest[at + 1..].join(" "))),
                    None => (rest.join(" "), None),
                };
                let time = time.filter(|t| !t.is_empty());
                let edit = match *field {
                    "start" => AssignmentOverride {
                        start_date: Some(date),
                        start_time: time,
                        ..AssignmentOverride::default()
                    },
                    "due" => AssignmentOverride {
                        due_date: Some(date),
                        due_time: time,
                        ..AssignmentOverride::default()
                    },
                    _ => {
                        println!("Field must be 'start' or 'due'");
                        continue;
                    }
                };
                match planner.override_assignment(&course_id, &name, &edit) {
                    Ok(n) => println!("Updated {n} assignments named {name}."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "copy" => match (parts.next(), parts.next()) {
                (Some(from), Some(to)) => {
                    let (Some(from_id), Some(to_id)) =
                        (resolve_course(&planner, from), resolve_course(&planner, to))
                    else {
                        println!("Unknown course");
                        continue;
                    };
                    match planner.copy_assignments(&from_id, &to_id) {
                        Ok(n) => println!("Copied {n} assignments from {from_id} to {to_id}."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: copy <from-course> <to-course>"),
            },
            "templates" => match planner.templates(&TemplateFilter::default()) {
                Ok(templates) => {
                    let rows: Vec<Vec<String>> = templates
                        .iter()
                        .map(|t| {
                            vec![
                                t.id.clone(),
                                t.name.clone(),
                                t.course_type.clone(),
                                t.pattern.map(|p| p.to_string()).unwrap_or_default(),
                                t.semester.to_string(),
                                t.meetings.len().to_string(),
                            ]
                        })
                        .collect();
                    println!(
                        "{}",
                        render_text_table(
                            &["Id", "Name", "Course Type", "Pattern", "Semester", "Meetings"],
                            &rows
                        )
                    );
                }
                Err(e) => println!("Error: {e}"),
            },
            "template-save" => {
                let args: Vec<&str> = parts.collect();
                let [course, name @ ..] = args.as_slice() else {
                    println!("Usage: template-save <course> <name...>");
                    continue;
                };
                let Some(course_id) = resolve_course(&planner, course) else {
                    println!("Unknown course {course}");
                    continue;
                };
                let name = name.join(" ");
                match planner.save_template(&course_id, &name, None) {
                    Ok(t) => println!("Saved template {} ({} {}).", t.id, t.course_type, t.semester),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "template-apply" => match (parts.next(), parts.next()) {
                (Some(id), Some(course)) => {
                    let Some(course_id) = resolve_course(&planner, course) else {
                        println!("Unknown course {course}");
                        continue;
                    };
                    match planner.apply_template(id, &course_id) {
                        Ok(calendar) => println!(
                            "Applied {id} to {course_id}: {} assignments, {} meetings.",
                            calendar.assignments.len(),
                            calendar.meetings.len()
                        ),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: template-apply <template> <course>"),
            },
            "template-delete" => match parts.next() {
                Some(id) => match planner.delete_template(id) {
                    Ok(true) => println!("Deleted template {id}."),
                    Ok(false) => println!("No template {id}."),
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: template-delete <template>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
