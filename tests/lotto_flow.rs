use chrono::NaiveDate;
use lotto645::config::Config;
use lotto645::database::SqliteStore;
use lotto645::draws::DrawSource;
use lotto645::generator::generate_from_seed;
use lotto645::history::{HistoryFilter, HistoryStore, ModeFilter};
use lotto645::rank::{Rank, evaluate_rank};
use lotto645::service::LottoService;
use lotto645::types::{Constraints, DrawInfo, Gender, NumberSet, UserInfo, WinningTarget};
use lotto645::LottoError;
use std::path::PathBuf;

fn temp_db(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lotto645-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("lotto.db")
}

fn user() -> UserInfo {
    UserInfo::new("19900101", Gender::Male).unwrap()
}

fn draw_info() -> DrawInfo {
    DrawInfo {
        draw_no: 1176,
        draw_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
    }
}

#[test]
fn history_survives_reopening_the_database() {
    let path = temp_db("reopen");
    let path_str = path.to_string_lossy().into_owned();
    let config = Config {
        database_url: path_str.clone(),
        ..Config::default()
    };

    let (normal, game) = {
        let store = SqliteStore::open(&path_str).unwrap();
        let mut service = LottoService::new(store, config.clone());
        let normal = service.generate(&user(), &Constraints::default(), draw_info()).unwrap();
        let target = WinningTarget::new(&[5, 11, 17, 23, 29, 35], 41).unwrap();
        let game = service.play_game(&user(), &Constraints::default(), target).unwrap();
        (normal, game)
    };

    let store = SqliteStore::open(&path_str).unwrap();
    let service = LottoService::new(store, config);
    let all = service.history(&HistoryFilter::default()).unwrap();
    assert_eq!(all, vec![game.entry.clone(), normal]);

    let state = service.game_state().unwrap();
    assert_eq!(state.last_sets, game.entry.numbers);
    assert_eq!(all[0].re_evaluate(), game.entry.rank_result);

    if let Some(dir) = path.parent() {
        std::fs::remove_dir_all(dir).unwrap();
    }
}

#[test]
fn imported_draws_drive_next_draw_and_checks() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut service = LottoService::new(store, Config::default());
    let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();

    assert_eq!(service.upcoming_draw(today).draw_no, 1175);

    let next = service.upcoming_draw(today);
    let entry = service.generate(&user(), &Constraints::default(), next).unwrap();
    assert_eq!(service.check_stored_entry(&entry.id).unwrap().unwrap().rank, None);

    // Build the "official" result from the entry's own first set so it wins.
    let first = entry.numbers[0];
    let bonus = (1..=45u8).find(|n| !first.contains(*n)).unwrap();
    let nums: Vec<String> = first.iter().map(|n| n.to_string()).collect();
    let raw = format!(
        r#"{{"returnValue":"success","drwNo":1175,"drwNoDate":"2025-06-07",
            "drwtNo1":{},"drwtNo2":{},"drwtNo3":{},"drwtNo4":{},"drwtNo5":{},"drwtNo6":{},
            "bnusNo":{},"totSellamnt":1,"firstWinamnt":1,"firstPrzwnerCo":1}}"#,
        nums[0], nums[1], nums[2], nums[3], nums[4], nums[5], bonus
    );
    service.store().parse_and_insert_draw_json(&raw).unwrap();

    let check = service.check_stored_entry(&entry.id).unwrap().unwrap();
    assert_eq!(check.rank, Some(Rank::First));
    assert_eq!(service.upcoming_draw(today).draw_no, 1176);
    assert_eq!(service.store().recent_draws(5).unwrap().len(), 1);
}

#[test]
fn history_cap_applies_through_the_service() {
    let store = SqliteStore::open_in_memory().unwrap();
    let config = Config {
        history_limit: 3,
        ..Config::default()
    };
    let mut service = LottoService::new(store, config);

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(service.generate(&user(), &Constraints::default(), draw_info()).unwrap().id);
    }
    let kept: Vec<String> = service
        .history(&HistoryFilter::default())
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(kept, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
    assert_eq!(service.store().all().unwrap().len(), 3);
}

#[test]
fn filters_separate_users_and_modes() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut service = LottoService::new(store, Config::default());
    let other = UserInfo::new("19851120", Gender::Female).unwrap();
    let target = WinningTarget::new(&[1, 2, 3, 4, 5, 6], 7).unwrap();

    service.generate(&user(), &Constraints::default(), draw_info()).unwrap();
    service.play_game(&user(), &Constraints::default(), target).unwrap();
    service.generate(&other, &Constraints::default(), draw_info()).unwrap();

    let mine = HistoryFilter::for_user(&user());
    assert_eq!(service.history(&mine).unwrap().len(), 2);
    assert_eq!(service.summary(&mine).unwrap().game_runs, 1);
    let normal_only = HistoryFilter::default().with_mode(ModeFilter::Normal);
    assert_eq!(service.summary(&normal_only).unwrap().total, 2);
}

#[test]
fn invalid_input_is_rejected_before_generation() {
    assert!(matches!(
        UserInfo::new("19900230", Gender::Male),
        Err(LottoError::InvalidBirthDate(_))
    ));
    assert!(matches!("x".parse::<Gender>(), Err(LottoError::InvalidGender(_))));
    assert!(matches!(
        WinningTarget::new(&[1, 2, 3, 4, 5, 5], 7),
        Err(LottoError::InvalidTarget(_))
    ));
    assert!(matches!(
        WinningTarget::new(&[1, 2, 3, 4, 5, 46], 7),
        Err(LottoError::InvalidTarget(_))
    ));

    let exhausted = Constraints::new().with_excluded(1..=40);
    match generate_from_seed(1, &exhausted) {
        Err(err @ LottoError::ConstraintExhausted { .. }) => assert!(!err.is_invalid_input()),
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[test]
fn generated_sets_rank_consistently() {
    let result = generate_from_seed(20_250_614, &Constraints::new().with_included([1, 2, 3])).unwrap();
    let target = WinningTarget::new(&[1, 2, 3, 40, 41, 42], 44).unwrap();
    for set in &result.sets {
        assert!(set.contains(1) && set.contains(2) && set.contains(3));
        assert!(evaluate_rank(set, &target) <= Rank::Fifth);
    }
    let set = NumberSet::new(&[1, 2, 3, 40, 41, 44]).unwrap();
    assert_eq!(evaluate_rank(&set, &target), Rank::Second);
}

#[test]
fn highest_imported_draw_number_does_not_break_next_draw() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut service = LottoService::new(store, Config::default());
    let raw = r#"{"draw_no":4294967295,"numbers":[1,2,3,4,5,6],"bonus_no":7,"date":"2025-06-07"}"#;
    assert_eq!(service.store().parse_and_insert_draw_json(raw).unwrap(), u32::MAX);

    let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
    let next = service.upcoming_draw(today);
    assert_eq!(next.draw_no, 1175);
    assert!(service.generate(&user(), &Constraints::default(), next).is_ok());
}
