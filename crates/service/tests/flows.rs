use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shema_api::{ApiClient, Submission};
use shema_core::{
    AssessmentId, Budget, CoreError, CourseDuration, LearningGoal, LearningStyle, Occupation,
    PaymentProof, Questionnaire, RegistrationForm, ScheduleChoice, ScheduleFilter,
    SchedulePreference, ScheduleSelection, SkillLevel, Weekday,
};
use shema_realtime::DisabledFeed;
use shema_service::{RecommendationService, RegistrationService, ServiceError};
use shema_watcher::WatchConfig;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, Arc<ApiClient>) {
    let server = MockServer::start().await;
    let client = Arc::new(ApiClient::new(&server.uri()).unwrap());
    (server, client)
}

fn fast() -> WatchConfig {
    WatchConfig {
        deadline: Duration::from_secs(5),
        poll_delay: Duration::from_millis(100),
        poll_interval: Duration::from_millis(50),
    }
}

fn recommendations(api: Arc<ApiClient>, config: WatchConfig) -> RecommendationService {
    RecommendationService::new(api, Arc::new(DisabledFeed), config)
}

fn answers() -> Questionnaire {
    Questionnaire {
        age: Some(17),
        instrument: "Piano".to_owned(),
        skill_level: Some(SkillLevel::Basic),
        learning_goal: Some(LearningGoal::Hobby),
        schedule_preference: Some(SchedulePreference::Unsure),
        flexibility_needed: Some(true),
        learning_style: Some(LearningStyle::Ministry),
        genre_interest: vec!["Pop".to_owned(), "Klasik".to_owned()],
        duration: Some(CourseDuration::Long),
        budget: Some(Budget::Rp400k),
        previous_experience: Some(false),
    }
}

fn analysis() -> serde_json::Value {
    json!({"recommendation": {"summary": "Piano pop untuk pemula"}})
}

#[tokio::test]
async fn test_recommend_returns_immediate_result() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment"))
        .and(body_partial_json(json!({"assessment_data": {"instruments": ["Piano"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"result": {"ai_analysis": analysis()}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let result = recommendations(api, fast()).recommend(&answers()).await.unwrap();
    assert_eq!(result.into_value(), analysis());
}

#[tokio::test]
async fn test_recommend_waits_for_background_analysis() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "assessment_id": "as-9"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results"))
        .and(query_param("assessment_id", "as-9"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results"))
        .and(query_param("assessment_id", "as-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"result": analysis()}
        })))
        .mount(&server)
        .await;

    let result = recommendations(api, fast()).recommend(&answers()).await.unwrap();
    assert_eq!(result.into_value(), analysis());
}

#[tokio::test]
async fn test_recommend_times_out() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "assessment_id": "as-slow"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = WatchConfig { deadline: Duration::from_millis(400), ..fast() };
    let error = recommendations(api, config).recommend(&answers()).await.unwrap_err();
    assert!(error.is_timeout(), "got {error:?}");
}

#[tokio::test]
async fn test_incomplete_answers_are_not_submitted() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let partial = Questionnaire { budget: None, ..answers() };
    let error = recommendations(api, fast()).submit(&partial).await.unwrap_err();
    assert!(matches!(error, ServiceError::Core(CoreError::IncompleteSection { section: 10, .. })));
}

#[tokio::test]
async fn test_submit_reports_pending_id() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "assessment_id": "as-1"})),
        )
        .mount(&server)
        .await;

    let submission = recommendations(api, fast()).submit(&answers()).await.unwrap();
    assert_eq!(submission, Submission::Pending(AssessmentId::new("as-1").unwrap()));
}

#[tokio::test]
async fn test_check_existing_latest_result() {
    let (server, api) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"result": {"ai_analysis": analysis()}}
        })))
        .mount(&server)
        .await;

    let existing = recommendations(api, fast()).check_existing(None).await.unwrap();
    assert_eq!(existing.map(|r| r.into_value()), Some(analysis()));
}

async fn mount_schedule(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/booking/available-instructors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"instructors": [
                {"id": "i1", "name": "Budi", "specialization": "Piano Klasik", "teaching_categories": ["reguler"]},
                {"id": "i2", "name": "Sari", "specialization": ["Vokal"]},
            ]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/booking/availability/find-slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"slots": [
                {"schedule_id": "s1", "instructor_id": "i1", "room_name": "Studio A",
                 "day_of_week": "saturday", "start_time": "10:30:00", "end_time": "11:30:00",
                 "status": "available"},
                {"schedule_id": "s2", "instructor_id": "i1", "room_name": "",
                 "day_of_week": "monday", "start_time": "15:00:00", "end_time": "16:00:00",
                 "status": "available"},
                {"schedule_id": "s3", "instructor_id": "i1", "room_name": "Studio B",
                 "day_of_week": "tuesday", "start_time": "09:00:00", "end_time": "10:00:00",
                 "status": "booked"},
            ]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_schedule_options_cascade() {
    let (server, api) = setup().await;
    mount_schedule(&server).await;

    let options = RegistrationService::new(api).schedule_options().await.unwrap();
    let filter = ScheduleFilter::new(Some("piano"), Some("reguler"));

    let names: Vec<_> = options.instructors_for(&filter).iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Budi"]);
    assert_eq!(options.slots.days("i1", &filter), [Weekday::Monday, Weekday::Saturday]);
    assert_eq!(options.slots.times("i1", Weekday::Monday), ["15:00 - 16:00"]);
    assert_eq!(options.slots.rooms("i1", Weekday::Monday, "15:00 - 16:00"), ["Regular Room"]);
    assert_eq!(options.instructor("i2").map(|i| i.name.as_str()), Some("Sari"));
}

fn form() -> RegistrationForm {
    RegistrationForm {
        full_name: "Yosua Tambunan".to_owned(),
        email: "yosua@example.com".to_owned(),
        phone: "081234".to_owned(),
        birth_date: "1999-09-09".to_owned(),
        birth_place: "Pematangsiantar".to_owned(),
        address: "Jl. Sudirman 5".to_owned(),
        instrument: "Piano".to_owned(),
        class_type: "reguler".to_owned(),
        course_id: "c1".to_owned(),
        price: 300_000,
        level: "Grade 1".to_owned(),
        occupation: Some(Occupation::PekerjaSwasta),
        ..RegistrationForm::default()
    }
}

fn payment(method: &str) -> PaymentProof {
    PaymentProof {
        method: method.to_owned(),
        proof_url: "https://cdn.example/proof.png".to_owned(),
        captcha_token: "captcha".to_owned(),
    }
}

#[tokio::test]
async fn test_register_requires_schedule_and_method() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/booking/register-course"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let service = RegistrationService::new(api);

    let empty = ScheduleSelection::default();
    let error = service.register(&form(), &empty, &payment("transfer")).await.unwrap_err();
    assert!(matches!(error, ServiceError::InvalidInput(_)));

    let mut schedules = ScheduleSelection::default();
    schedules
        .add(ScheduleChoice {
            instructor_id: "i1".to_owned(),
            instructor_name: "Budi".to_owned(),
            day: Weekday::Saturday,
            time: "10.30 - 11.30".parse().unwrap(),
            room: "Studio A".to_owned(),
        })
        .unwrap();
    let error = service.register(&form(), &schedules, &payment(" ")).await.unwrap_err();
    assert!(matches!(error, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn test_register_sends_preferences() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/booking/register-course"))
        .and(body_partial_json(json!({
            "course_id": "c1",
            "notes": "Payment Method: transfer",
            "first_preference": {
                "day": "saturday",
                "start_time": "10:30",
                "end_time": "11:30",
                "instructor_id": "i1"
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"booking_id": "bk-77"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut schedules = ScheduleSelection::default();
    schedules
        .add(ScheduleChoice {
            instructor_id: "i1".to_owned(),
            instructor_name: "Budi".to_owned(),
            day: Weekday::Saturday,
            time: "10.30 - 11.30".parse().unwrap(),
            room: "Studio A".to_owned(),
        })
        .unwrap();

    let confirmation = RegistrationService::new(api)
        .register(&form(), &schedules, &payment("transfer"))
        .await
        .unwrap();
    assert_eq!(confirmation.booking_id, "bk-77");
}
