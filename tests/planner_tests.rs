use chrono::NaiveDate;
use class_calendar::{
    AssignmentItem, AssignmentOverride, CalendarError, ClassMeetingItem, Course, CourseCalendar,
    MemoryStore, MoveStatus, Planner, PlannerConfig, PlannerError, SearchLimits, Semester,
    StoreError, TemplateFilter, WeekdayPattern,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fall_calendar(course_id: &str) -> CourseCalendar {
    let mut calendar = CourseCalendar::new(course_id);
    calendar.assignments = vec![
        AssignmentItem::new("Class starts").with_start(d(2024, 8, 26), None),
        AssignmentItem::new("Reading Response")
            .with_start(d(2024, 8, 26), None)
            .with_due(d(2024, 8, 28), Some("11:59 PM")),
    ];
    calendar.meetings = vec![
        ClassMeetingItem::new(d(2024, 8, 26), "Introduction"),
        ClassMeetingItem::new(d(2024, 8, 28), "Lecture 1"),
        ClassMeetingItem::new(d(2024, 9, 2), "Labor Day"),
        ClassMeetingItem::new(d(2024, 9, 4), "Quiz 1"),
        ClassMeetingItem::new(d(2024, 9, 9), "Lecture 2"),
    ];
    calendar
}

fn planner_with(calendar: CourseCalendar) -> Planner<MemoryStore> {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    planner.save_calendar(&calendar).unwrap();
    planner
}

#[test]
fn unknown_course_is_rejected() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    let err = planner
        .save_calendar(&CourseCalendar::new("ZZ 9999"))
        .unwrap_err();
    assert!(matches!(err, PlannerError::UnknownCourse(_)));
}

#[test]
fn plan_future_requires_stored_calendar() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    let err = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap_err();
    assert!(matches!(err, PlannerError::NoCalendar(_)));
}

#[test]
fn plan_future_applies_target_holidays() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let planned = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap();
    assert_eq!(planned.summary.source_epoch, d(2024, 8, 26));
    assert_eq!(planned.summary.target_epoch, d(2025, 1, 13));

    let dates: Vec<(&str, NaiveDate)> = planned
        .meetings()
        .map(|m| (m.description.as_str(), m.date))
        .collect();
    // Quiz 1 (day 3, one source holiday before it) becomes day 2, which is
    // MLK day in the target semester and gets pushed to day 3
    assert_eq!(
        dates,
        vec![
            ("Introduction", d(2025, 1, 13)),
            ("Lecture 1", d(2025, 1, 15)),
            ("Quiz 1", d(2025, 1, 22)),
            ("Lecture 2", d(2025, 1, 22)),
        ]
    );
    let reading = planned.assignments().next().unwrap();
    assert_eq!(reading.due_date, Some(d(2025, 1, 15)));
}

#[test]
fn plan_future_rejects_calendar_without_dates() {
    let mut calendar = CourseCalendar::new("FM 4103");
    calendar.assignments = vec![AssignmentItem::new("Undated")];
    let planner = planner_with(calendar);
    let err = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Calendar(CalendarError::MissingStartDate { .. })
    ));
}

#[test]
fn unresolvable_schedule_is_reported() {
    let config = PlannerConfig {
        courses: vec![Course::new("XX 1000", "Online")],
        ..PlannerConfig::default()
    };
    let planner = Planner::new(MemoryStore::new(), config);
    planner.save_calendar(&fall_calendar("XX 1000")).unwrap();
    let err = planner.plan_future("XX 1000", d(2025, 1, 13)).unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Calendar(CalendarError::UnresolvedPattern { .. })
    ));
}

#[test]
fn configured_holidays_replace_builtin_year() {
    let config = PlannerConfig {
        holidays: BTreeMap::from([(2025, Vec::new())]),
        ..PlannerConfig::default()
    };
    let planner = Planner::new(MemoryStore::new(), config);
    planner.save_calendar(&fall_calendar("FM 4103")).unwrap();
    let planned = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap();
    let quiz = planned
        .meetings()
        .find(|m| m.description == "Quiz 1")
        .unwrap();
    assert_eq!(quiz.date, d(2025, 1, 20));
}

#[test]
fn accept_future_stores_translated_assignments() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let planned = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap();
    assert_eq!(planner.accept_future("FM 4103", &planned).unwrap(), 1);

    let stored = planner.load_calendar("FM 4103").unwrap().unwrap();
    assert_eq!(stored.accepted_future.len(), 1);
    assert_eq!(stored.accepted_future[0].name, "Reading Response");
    assert_eq!(stored.assignments, fall_calendar("FM 4103").assignments);
}

#[test]
fn move_meeting_persists_resolved_cascade() {
    let mut planner = planner_with(fall_calendar("FM 4103"));
    let outcome = planner
        .move_meeting("FM 4103", d(2024, 8, 28), d(2024, 9, 4), None)
        .unwrap();
    assert_eq!(outcome.status, MoveStatus::Moved);

    let stored = planner.load_calendar("FM 4103").unwrap().unwrap();
    let date_of = |name: &str| {
        stored
            .meetings
            .iter()
            .find(|m| m.description == name)
            .map(|m| m.date)
            .unwrap()
    };
    assert_eq!(date_of("Lecture 1"), d(2024, 9, 4));
    // Quiz 1 is displaced onto Lecture 2, which moves on to Wednesday
    assert_eq!(date_of("Quiz 1"), d(2024, 9, 9));
    assert_eq!(date_of("Lecture 2"), d(2024, 9, 11));
    assert_eq!(date_of("Labor Day"), d(2024, 9, 2));
}

#[test]
fn stale_move_leaves_calendar_untouched() {
    let mut planner = planner_with(fall_calendar("FM 4103"));
    let outcome = planner
        .move_meeting("FM 4103", d(2024, 8, 30), d(2024, 9, 4), None)
        .unwrap();
    assert_eq!(outcome.status, MoveStatus::NotFound);
    assert_eq!(
        planner.load_calendar("FM 4103").unwrap().unwrap(),
        fall_calendar("FM 4103")
    );
}

#[test]
fn plan_many_translates_each_course() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    planner.save_calendar(&fall_calendar("FM 4103")).unwrap();
    planner.save_calendar(&fall_calendar("CA 4105")).unwrap();

    let ids = vec![
        "FM 4103".to_string(),
        "CA 4105".to_string(),
        "CA 4201".to_string(),
    ];
    let results = planner.plan_many(&ids, d(2025, 1, 13));
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "FM 4103");
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_ok());
    assert!(matches!(results[2].1, Err(PlannerError::NoCalendar(_))));
}

#[test]
fn clear_range_and_delete() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let removed = planner
        .clear_range("FM 4103", d(2024, 9, 1), d(2024, 9, 5))
        .unwrap();
    assert_eq!(removed, 2);
    let stored = planner.load_calendar("FM 4103").unwrap().unwrap();
    assert_eq!(stored.meetings.len(), 3);

    assert_eq!(planner.stored_course_ids().unwrap(), vec!["FM 4103"]);
    assert!(planner.delete_calendar("FM 4103").unwrap());
    assert!(planner.load_calendar("FM 4103").unwrap().is_none());
}

#[test]
fn holiday_label_honours_configured_years() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    assert_eq!(
        planner.holiday_label(d(2025, 1, 20)).as_deref(),
        Some("Martin Luther King Jr. Holiday (Offices Closed)")
    );
    assert_eq!(planner.holiday_label(d(2025, 1, 21)), None);
}

#[test]
fn class_day_uses_stored_semester_start() {
    let planner = planner_with(fall_calendar("FM 4103"));
    assert_eq!(planner.class_day("FM 4103", d(2024, 9, 9)).unwrap(), Some(4));
    assert_eq!(planner.class_day("FM 4103", d(2024, 9, 6)).unwrap(), None);
}

fn date_of(calendar: &CourseCalendar, name: &str) -> NaiveDate {
    calendar
        .meetings
        .iter()
        .find(|m| m.description == name)
        .map(|m| m.date)
        .unwrap()
}

#[test]
fn exhausted_move_stores_best_placement() {
    let config = PlannerConfig {
        limits: SearchLimits {
            cascade_hops: 1,
            ..SearchLimits::default()
        },
        ..PlannerConfig::default()
    };
    let mut planner = Planner::new(MemoryStore::new(), config);
    planner.save_calendar(&fall_calendar("FM 4103")).unwrap();

    let outcome = planner
        .move_meeting("FM 4103", d(2024, 8, 28), d(2024, 9, 4), None)
        .unwrap();
    assert_eq!(outcome.status, MoveStatus::Exhausted);
    assert!(outcome.is_degraded());

    let stored = planner.load_calendar("FM 4103").unwrap().unwrap();
    assert_eq!(stored.meetings, outcome.meetings);
    assert_eq!(date_of(&stored, "Lecture 1"), d(2024, 9, 4));
    assert_eq!(date_of(&stored, "Quiz 1"), d(2024, 9, 9));
    // the chain stopped before Lecture 2 could move on
    assert_eq!(date_of(&stored, "Lecture 2"), d(2024, 9, 9));
}

#[test]
fn override_assignment_edits_current_and_accepted_lists() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let planned = planner.plan_future("FM 4103", d(2025, 1, 13)).unwrap();
    planner.accept_future("FM 4103", &planned).unwrap();

    let edit = AssignmentOverride {
        due_date: Some(d(2024, 8, 30)),
        due_time: Some("5:00 PM".to_string()),
        ..AssignmentOverride::default()
    };
    assert_eq!(
        planner
            .override_assignment("FM 4103", "Reading Response", &edit)
            .unwrap(),
        2
    );

    let stored = planner.load_calendar("FM 4103").unwrap().unwrap();
    let reading = &stored.assignments[1];
    assert_eq!(reading.start_date, Some(d(2024, 8, 26)));
    assert_eq!(reading.due_date, Some(d(2024, 8, 30)));
    assert_eq!(reading.due_time.as_deref(), Some("5:00 PM"));
    assert_eq!(stored.accepted_future[0].due_date, Some(d(2024, 8, 30)));

    let err = planner
        .override_assignment("FM 4103", "Missing", &edit)
        .unwrap_err();
    assert!(matches!(err, PlannerError::UnknownAssignment { .. }));
}

#[test]
fn clear_semester_uses_calendar_semester_by_default() {
    let planner = planner_with(fall_calendar("FM 4103"));
    assert_eq!(
        planner.clear_semester("FM 4103", Some(d(2025, 2, 3))).unwrap(),
        (Semester::Spring, 0)
    );
    assert_eq!(
        planner.clear_semester("FM 4103", None).unwrap(),
        (Semester::Fall, 7)
    );
    assert!(planner.load_calendar("FM 4103").unwrap().unwrap().is_empty());

    let err = planner
        .clear_semester("FM 4103", Some(d(2025, 7, 15)))
        .unwrap_err();
    assert!(matches!(err, PlannerError::NoSemester(_)));
}

#[test]
fn suggested_start_follows_semester_and_pattern() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    planner.save_calendar(&fall_calendar("FM 4103")).unwrap();
    planner.save_calendar(&fall_calendar("CA 4201")).unwrap();
    // January 15 2025 is a Wednesday
    assert_eq!(
        planner.suggested_target_start("FM 4103").unwrap(),
        d(2025, 1, 15)
    );
    assert_eq!(
        planner.suggested_target_start("CA 4201").unwrap(),
        d(2025, 1, 16)
    );
}

#[test]
fn copy_assignments_shifts_tuesday_thursday_onto_monday_wednesday() {
    let planner = Planner::new(MemoryStore::new(), PlannerConfig::default());
    let mut source = CourseCalendar::new("CA 4201");
    source.assignments = vec![
        AssignmentItem::new("Reading Response")
            .with_start(d(2024, 8, 27), None)
            .with_due(d(2024, 8, 29), Some("11:59 PM")),
    ];
    planner.save_calendar(&source).unwrap();

    assert_eq!(planner.copy_assignments("CA 4201", "CA 4105").unwrap(), 1);
    let copied = planner.load_calendar("CA 4105").unwrap().unwrap();
    assert_eq!(copied.assignments[0].start_date, Some(d(2024, 8, 26)));
    assert_eq!(copied.assignments[0].due_date, Some(d(2024, 8, 28)));
    assert_eq!(copied.assignments[0].due_time.as_deref(), Some("11:59 PM"));

    let err = planner.copy_assignments("CA 4105", "CA 4201").unwrap_err();
    assert!(matches!(
        err,
        PlannerError::IncompatiblePatterns {
            from: WeekdayPattern::MondayWednesday,
            to: WeekdayPattern::TuesdayThursday,
        }
    ));
}

#[test]
fn templates_save_filter_apply_and_delete() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let template = planner
        .save_template("FM 4103", "Finite Fall MW", None)
        .unwrap();
    assert_eq!(template.id, "default-finite-fall-mw");
    assert_eq!(template.course_type, "Finite Math");
    assert_eq!(template.pattern, Some(WeekdayPattern::MondayWednesday));
    assert_eq!(template.semester, Semester::Fall);
    assert_eq!(template.meetings.len(), 5);

    let by_semester = TemplateFilter {
        semester: Some(Semester::Fall),
        ..TemplateFilter::default()
    };
    assert_eq!(planner.templates(&by_semester).unwrap(), vec![template.clone()]);
    let algebra = TemplateFilter {
        course_type: Some("College Algebra".to_string()),
        ..TemplateFilter::default()
    };
    assert!(planner.templates(&algebra).unwrap().is_empty());

    let applied = planner.apply_template(&template.id, "CA 4105").unwrap();
    assert_eq!(applied.course_id, "CA 4105");
    assert_eq!(applied.meetings, template.meetings);
    assert_eq!(
        planner.load_calendar("CA 4105").unwrap(),
        Some(applied.clone())
    );
    assert!(matches!(
        planner.apply_template(&template.id, "CA 4201"),
        Err(PlannerError::IncompatiblePatterns { .. })
    ));

    assert!(planner.delete_template(&template.id).unwrap());
    assert_eq!(planner.template(&template.id).unwrap(), None);
    assert!(matches!(
        planner.apply_template(&template.id, "CA 4105"),
        Err(PlannerError::NoTemplate(_))
    ));
}

#[test]
fn template_name_needs_letters_or_digits() {
    let planner = planner_with(fall_calendar("FM 4103"));
    let err = planner.save_template("FM 4103", " -- ", None).unwrap_err();
    assert!(matches!(err, PlannerError::Store(StoreError::InvalidData(_))));
}
