use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    AssignmentOverride, CalendarTemplate, CourseCalendar, KeyValueStore, MoveOutcome, MoveStatus,
    OffsetCalendar, Planner, PlannerError, Semester, StoreError, TemplateFilter, WeekdayPattern,
    class_day_number, date_for_class_day, first_class_day,
};

pub type SharedPlanner = Planner<Box<dyn KeyValueStore>>;

#[derive(Clone)]
pub struct AppState {
    planner: Arc<RwLock<SharedPlanner>>,
}

impl AppState {
    pub fn new(planner: SharedPlanner) -> Self {
        Self {
            planner: Arc::new(RwLock::new(planner)),
        }
    }

    pub fn with_shared(planner: Arc<RwLock<SharedPlanner>>) -> Self {
        Self { planner }
    }

    fn planner(&self) -> Arc<RwLock<SharedPlanner>> {
        self.planner.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::UnknownCourse(_)
            | PlannerError::NoCalendar(_)
            | PlannerError::UnknownAssignment { .. }
            | PlannerError::NoTemplate(_) => ApiError::NotFound(value.to_string()),
            PlannerError::NoSemester(_) | PlannerError::IncompatiblePatterns { .. } => {
                ApiError::Invalid(value.to_string())
            }
            PlannerError::Calendar(err) => ApiError::Invalid(err.to_string()),
            PlannerError::Store(StoreError::InvalidData(message)) => ApiError::Invalid(message),
            PlannerError::Store(StoreError::NotFound(key)) => {
                ApiError::NotFound(format!("nothing stored under {key}"))
            }
            PlannerError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct CourseEntry {
    id: String,
    name: String,
    schedule: String,
    pattern: Option<WeekdayPattern>,
    has_calendar: bool,
}

#[derive(Debug, Deserialize)]
struct OffsetPayload {
    #[serde(default)]
    target_start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ClearSemesterPayload {
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct SaveTemplatePayload {
    course_id: String,
    name: String,
    #[serde(default)]
    semester: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplyTemplatePayload {
    template_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateQuery {
    course_type: Option<String>,
    pattern: Option<String>,
    semester: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    source: NaiveDate,
    target: NaiveDate,
    #[serde(default)]
    item: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NumberQuery {
    pattern: String,
    epoch: NaiveDate,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    pattern: String,
    epoch: NaiveDate,
    n: i64,
}

#[derive(Debug, Deserialize)]
struct FirstQuery {
    pattern: String,
    on_or_after: NaiveDate,
}

fn parse_pattern(raw: &str) -> Result<WeekdayPattern, ApiError> {
    raw.parse::<WeekdayPattern>()
        .map_err(|err| ApiError::invalid(err.to_string()))
}

fn parse_semester(raw: &str) -> Result<Semester, ApiError> {
    raw.parse::<Semester>().map_err(ApiError::invalid)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route(
            "/courses/:id/calendar",
            get(get_calendar).put(put_calendar).delete(delete_calendar),
        )
        .route("/courses/:id/offset", post(plan_offset))
        .route("/courses/:id/suggested-start", get(suggested_start))
        .route("/courses/:id/meetings/move", post(move_meeting))
        .route("/courses/:id/assignments/:name", patch(override_assignment))
        .route("/courses/:id/clear-semester", post(clear_semester))
        .route("/courses/:id/apply-template", post(apply_template))
        .route("/templates", get(list_templates).post(save_template))
        .route("/templates/:id", get(get_template).delete(delete_template))
        .route("/class-days/number", get(class_day_for_date))
        .route("/class-days/date", get(date_for_number))
        .route("/class-days/first", get(first_day))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "class-calendar HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseEntry>>, ApiError> {
    let planner = state.planner();
    let guard = planner.read();
    let stored = guard.stored_course_ids().map_err(ApiError::from)?;
    let courses = guard
        .courses()
        .iter()
        .map(|course| CourseEntry {
            id: course.id.clone(),
            name: course.name.clone(),
            schedule: course.schedule.clone(),
            pattern: course.pattern().ok(),
            has_calendar: stored.contains(&course.id),
        })
        .collect();
    Ok(Json(courses))
}

async fn get_calendar(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseCalendar>, ApiError> {
    let planner = state.planner();
    let calendar = {
        let guard = planner.read();
        guard.course(&course_id)?;
        guard.load_calendar(&course_id)?
    };
    calendar
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no calendar stored for course {course_id}")))
}

async fn put_calendar(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(calendar): Json<CourseCalendar>,
) -> Result<Json<CourseCalendar>, ApiError> {
    if calendar.course_id != course_id {
        return Err(ApiError::invalid(
            "course id in payload does not match path parameter",
        ));
    }
    let planner = state.planner();
    {
        let guard = planner.write();
        guard.save_calendar(&calendar)?;
    }
    Ok(Json(calendar))
}

async fn delete_calendar(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let planner = state.planner();
    let removed = {
        let guard = planner.write();
        guard.delete_calendar(&course_id)?
    };
    if !removed {
        return Err(ApiError::not_found(format!(
            "no calendar stored for course {course_id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn plan_offset(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(payload): Json<OffsetPayload>,
) -> Result<Json<OffsetCalendar>, ApiError> {
    let planner = state.planner();
    let planned = {
        let guard = planner.read();
        let target_start = match payload.target_start {
            Some(date) => date,
            None => guard.suggested_target_start(&course_id)?,
        };
        guard.plan_future(&course_id, target_start)?
    };
    Ok(Json(planned))
}

async fn suggested_start(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let planner = state.planner();
    let date = planner.read().suggested_target_start(&course_id)?;
    Ok(Json(json!({ "date": date })))
}

async fn move_meeting(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(payload): Json<MovePayload>,
) -> Result<Json<MoveOutcome>, ApiError> {
    let planner = state.planner();
    let outcome = {
        let mut guard = planner.write();
        guard.move_meeting(
            &course_id,
            payload.source,
            payload.target,
            payload.item.as_deref(),
        )?
    };
    match outcome.status {
        MoveStatus::NotFound => Err(ApiError::not_found(format!(
            "no movable meeting on {} for course {course_id}",
            payload.source
        ))),
        MoveStatus::Moved | MoveStatus::Unchanged | MoveStatus::Exhausted => Ok(Json(outcome)),
    }
}

async fn override_assignment(
    State(state): State<AppState>,
    Path((course_id, name)): Path<(String, String)>,
    Json(edit): Json<AssignmentOverride>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let planner = state.planner();
    let updated = planner.write().override_assignment(&course_id, &name, &edit)?;
    Ok(Json(json!({ "updated": updated })))
}

async fn clear_semester(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(payload): Json<ClearSemesterPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let planner = state.planner();
    let (semester, removed) = planner.write().clear_semester(&course_id, payload.date)?;
    Ok(Json(json!({ "semester": semester, "removed": removed })))
}

async fn apply_template(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(payload): Json<ApplyTemplatePayload>,
) -> Result<Json<CourseCalendar>, ApiError> {
    let planner = state.planner();
    let calendar = planner
        .write()
        .apply_template(&payload.template_id, &course_id)?;
    Ok(Json(calendar))
}

async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<CalendarTemplate>>, ApiError> {
    let filter = TemplateFilter {
        course_type: query.course_type,
        pattern: query.pattern.as_deref().map(parse_pattern).transpose()?,
        semester: query.semester.as_deref().map(parse_semester).transpose()?,
    };
    let planner = state.planner();
    let templates = planner.read().templates(&filter)?;
    Ok(Json(templates))
}

async fn save_template(
    State(state): State<AppState>,
    Json(payload): Json<SaveTemplatePayload>,
) -> Result<(StatusCode, Json<CalendarTemplate>), ApiError> {
    let semester = payload.semester.as_deref().map(parse_semester).transpose()?;
    let planner = state.planner();
    let template = planner
        .write()
        .save_template(&payload.course_id, &payload.name, semester)?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CalendarTemplate>, ApiError> {
    let planner = state.planner();
    let template = planner.read().template(&id)?;
    template
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no template stored under {id}")))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let planner = state.planner();
    let removed = planner.write().delete_template(&id)?;
    if !removed {
        return Err(ApiError::not_found(format!("no template stored under {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn class_day_for_date(
    Query(query): Query<NumberQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pattern = parse_pattern(&query.pattern)?;
    let class_day = class_day_number(query.date, query.epoch, pattern);
    Ok(Json(json!({ "class_day": class_day })))
}

async fn date_for_number(
    Query(query): Query<DateQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pattern = parse_pattern(&query.pattern)?;
    let date = date_for_class_day(query.n, query.epoch, pattern);
    Ok(Json(json!({ "date": date })))
}

async fn first_day(Query(query): Query<FirstQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    let pattern = parse_pattern(&query.pattern)?;
    let date = first_class_day(query.on_or_after, pattern);
    Ok(Json(json!({ "date": date })))
}
