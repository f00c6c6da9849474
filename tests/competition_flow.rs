use std::cell::RefCell;

use integral_cup::{
    SyncMessage, UpdateMessage,
    competition::{self, Competition, IncomingMessage, Phase, Services},
    config::Options,
    exam::{question::Question, state::Event},
    participant::{Id, Status, Student},
    progress::Advancement,
    round::Round,
    storage::MemoryStore,
    store::{
        auth::{Accounts, Registration, Role},
        roster::Rosters,
        stages::{Stage, Stages},
    },
};

#[derive(Default)]
struct RecordingView {
    updates: RefCell<Vec<UpdateMessage>>,
    states: RefCell<Vec<SyncMessage>>,
}

impl integral_cup::session::ProctorView for RecordingView {
    fn send_message(&self, message: &UpdateMessage) {
        self.updates.borrow_mut().push(message.clone());
    }

    fn send_state(&self, state: &SyncMessage) {
        self.states.borrow_mut().push(state.clone());
    }
}

impl RecordingView {
    fn exam_events(&self) -> Vec<Event> {
        self.updates
            .borrow()
            .iter()
            .filter_map(|m| match m {
                UpdateMessage::Exam(event) => Some(event.clone()),
                UpdateMessage::Competition(_) => None,
            })
            .collect()
    }

    fn notices(&self) -> Vec<String> {
        self.updates
            .borrow()
            .iter()
            .filter_map(|m| match m {
                UpdateMessage::Competition(competition::UpdateMessage::Notice(n)) => {
                    Some(n.clone())
                }
                _ => None,
            })
            .collect()
    }
}

fn send(
    competition: &mut Competition<MemoryStore, Rosters, Stages>,
    view: &RecordingView,
    message: IncomingMessage,
) {
    competition.receive_message(message, |_, _| {}, view);
}

#[test]
fn nine_students_play_round_one() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut accounts = Accounts::with_cost(4);
    accounts
        .register(&Registration {
            username: "proctor".to_owned(),
            password: "integrals".to_owned(),
            college_name: "X".to_owned(),
            role: Role::Proctor,
        })
        .unwrap();
    let session = accounts.login("proctor", "integrals").unwrap();

    let mut rosters = Rosters::new();
    rosters
        .add(
            "X",
            (1..=9)
                .map(|i| Student {
                    name: format!("Student {i}"),
                    roll_no: format!("R{i:02}"),
                })
                .collect(),
        )
        .unwrap();

    let mut stages = Stages::new();
    stages
        .upsert(Stage {
            stage_name: Round::Top16.stage_name().to_owned(),
            stage_id: 1,
            questions: vec![Question::new(r"\int_0^1 x\,dx", r"\frac{1}{2}")],
        })
        .unwrap();

    let view = RecordingView::default();
    let mut competition = Competition::init(
        Options::default(),
        "X",
        Services {
            store: MemoryStore::new(),
            rosters,
            questions: stages,
        },
        fastrand::Rng::with_seed(2024),
    )
    .unwrap();
    competition.sign_in(session).unwrap();

    send(&mut competition, &view, IncomingMessage::LoadRoster);
    send(&mut competition, &view, IncomingMessage::FormGroups);

    let groups = competition.progress().all_groups().to_vec();
    assert_eq!(groups.len(), 3);
    assert!(groups.iter().all(|g| g.size() == 3));

    for (played, group) in groups.iter().enumerate() {
        send(
            &mut competition,
            &view,
            IncomingMessage::SelectGroup(group.group_number),
        );
        assert_eq!(
            competition.progress().remaining_groups().len(),
            groups.len() - played - 1
        );

        send(&mut competition, &view, IncomingMessage::StartExam);

        let ids: Vec<Id> = group.member_ids();
        for (id, status) in ids
            .iter()
            .zip([Status::Correct, Status::Incorrect, Status::Incorrect])
        {
            send(
                &mut competition,
                &view,
                IncomingMessage::Mark {
                    participant: *id,
                    status,
                },
            );
        }
        send(&mut competition, &view, IncomingMessage::Reveal);
        send(&mut competition, &view, IncomingMessage::Next);
        assert!(matches!(competition.phase(), Phase::GroupResults(n) if *n == group.group_number));

        let leaderboard = competition.leaderboard(Round::Top16);
        let scores: Vec<f64> = ids
            .iter()
            .map(|id| leaderboard.standing(*id).map_or(0., |s| s.points))
            .collect();
        assert!((scores[0] - 8. / 3.).abs() < 1e-9);
        assert!((scores[1] + 4. / 3.).abs() < 1e-9);
        assert!((scores[2] + 4. / 3.).abs() < 1e-9);
        assert!(scores.iter().sum::<f64>().abs() < 1e-9);

        if played == 0 {
            assert_eq!(competition.progress().remaining_groups().len(), 2);
            assert!(!competition.progress().round_complete());
        }

        send(&mut competition, &view, IncomingMessage::Continue);
    }

    assert!(competition.progress().round_complete());
    assert!(matches!(competition.phase(), Phase::RoundComplete));
    assert_eq!(
        competition.progress().advancement(),
        Advancement::NextRound(Round::Quarterfinal)
    );

    let events = view.exam_events();
    let resets = events
        .iter()
        .filter(|e| matches!(e, Event::TimerReset { .. }))
        .count();
    let ends = events
        .iter()
        .filter(|e| matches!(e, Event::Ended { .. }))
        .count();
    assert_eq!((resets, ends), (3, 3));
    assert!(view.notices().is_empty());

    send(&mut competition, &view, IncomingMessage::AdvanceRound);
    assert_eq!(competition.round(), Round::Quarterfinal);
    assert!(matches!(competition.phase(), Phase::Attendance));
    assert!(competition.progress().progress().groups.is_none());
    assert!(matches!(
        view.states.borrow().last(),
        Some(SyncMessage::Competition(competition::SyncMessage::Attendance { round: Round::Quarterfinal, .. }))
    ));
}

#[test]
fn persisted_progress_is_stable() {
    let mut rosters = Rosters::new();
    rosters
        .add(
            "X",
            (1..=12)
                .map(|i| Student {
                    name: format!("Student {i}"),
                    roll_no: i.to_string(),
                })
                .collect(),
        )
        .unwrap();

    let mut competition = Competition::init(
        Options::default(),
        "X",
        Services {
            store: MemoryStore::new(),
            rosters,
            questions: Stages::new(),
        },
        fastrand::Rng::with_seed(5),
    )
    .unwrap();
    competition
        .sign_in(integral_cup::store::auth::AuthSession {
            token: "t".to_owned(),
            username: "p".to_owned(),
            college_name: "X".to_owned(),
            role: Role::Proctor,
        })
        .unwrap();

    let view = RecordingView::default();
    send(&mut competition, &view, IncomingMessage::LoadRoster);
    send(&mut competition, &view, IncomingMessage::FormGroups);

    let store = competition.progress().store().clone();
    let mut cache = integral_cup::progress::ProgressCache::new(store);
    let restored = cache.restore("X", Some(Round::Top16)).unwrap().cloned();
    assert_eq!(restored.as_ref(), Some(competition.progress().progress()));

    let progress = restored.unwrap();
    assert_eq!(progress.total_participants, Some(12));
    assert_eq!(progress.scoring_system.as_deref(), Some("+2 to -2"));
    assert_eq!(progress.groups.map(|g| g.len()), Some(3));
}
