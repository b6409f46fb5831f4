use chrono::{TimeZone, Utc};
use medqa::record::KeywordField;
use medqa::{Engine, EngineConfig, LabeledPair, MatchOutcome, MatchPath, RawRecord};

fn engine() -> Engine {
  Engine::new(EngineConfig::default()).unwrap()
}

fn record(question: &str, answer: &str, keywords: &[&str], day: u32) -> RawRecord {
  RawRecord {
    question: Some(question.to_string()),
    answer: Some(answer.to_string()),
    keywords: Some(KeywordField::List(keywords.iter().map(|k| k.to_string()).collect())),
    created_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap()),
    ..RawRecord::default()
  }
}

/// A question whose terms appear in no other record: `head` plus eight fillers
fn padded(head: &str, filler: &str) -> String {
  let mut terms = vec![head.to_string()];
  terms.extend(('a'..='h').map(|suffix| format!("{filler}{suffix}")));
  terms.join(" ")
}

#[test]
fn keyword_hit_returns_its_answer() {
  let engine = engine();
  engine.build_index(vec![record("头痛怎么办", "建议休息", &["头痛"], 1)]).unwrap();

  match engine.match_query("我头痛").unwrap() {
    MatchOutcome::Found { answer, via, record_id, .. } => {
      assert_eq!(answer, "建议休息");
      assert_eq!(via, MatchPath::Keyword);
      assert_eq!(record_id, 0);
    }
    MatchOutcome::NotFound => panic!("expected the keyword path to answer"),
  }
}

#[test]
fn empty_corpus_answers_nothing() {
  let engine = engine();
  engine.build_index(Vec::<RawRecord>::new()).unwrap();

  assert_eq!(engine.match_query("我头痛").unwrap(), MatchOutcome::NotFound);

  let result = engine.evaluate(&[]);
  assert_eq!(result.accuracy, 0.0);
  assert_eq!(result.total, 0);
  assert_eq!(result.matched, 0);
}

#[test]
fn most_recent_keyword_record_wins() {
  let engine = engine();
  engine
    .build_index(vec![
      record("发烧了怎么办", "多喝热水", &["发烧"], 1),
      record("发烧了怎么办", "及时就医", &["发烧"], 2),
    ])
    .unwrap();

  let outcome = engine.match_query("我发烧了").unwrap();
  assert_eq!(outcome.answer(), Some("及时就医"));
}

#[test]
fn similarity_fallback_above_threshold() {
  let engine = engine();
  engine
    .build_index(vec![
      record("fever cough", "rest and fluids", &["tagzero"], 1),
      record(&padded("rash", "rashfill"), "antihistamine", &["tagone"], 1),
      record(&padded("itch", "itchfill"), "moisturizer", &["tagtwo"], 1),
      record(&padded("nausea", "nauseafill"), "ginger tea", &["tagthree"], 1),
    ])
    .unwrap();

  match engine.match_query("fever rash itch nausea").unwrap() {
    MatchOutcome::Found { answer, via, score, .. } => {
      assert_eq!(answer, "rest and fluids");
      assert_eq!(via, MatchPath::Similarity);
      assert!((score - 1.0 / (2.0 * 2f64.sqrt())).abs() < 1e-9);
      assert!(score > 0.3);
    }
    MatchOutcome::NotFound => panic!("expected a similarity match"),
  }
}

#[test]
fn similarity_fallback_below_threshold() {
  let engine = engine();
  engine
    .build_index(vec![
      record("fever cough chills", "rest and fluids", &["tagzero"], 1),
      record(&padded("rash", "rashfill"), "antihistamine", &["tagone"], 1),
      record(&padded("itch", "itchfill"), "moisturizer", &["tagtwo"], 1),
      record(&padded("nausea", "nauseafill"), "ginger tea", &["tagthree"], 1),
    ])
    .unwrap();

  let handle = engine.current_index();
  let questions = handle.questions();
  let projected = questions.project("fever rash itch nausea", engine.normalizer());
  let best = questions.similarities(&projected).unwrap().into_iter().fold(0.0f64, f64::max);
  assert!((best - 1.0 / (2.0 * 3f64.sqrt())).abs() < 1e-9);

  assert_eq!(engine.match_query("fever rash itch nausea").unwrap(), MatchOutcome::NotFound);
}

#[test]
fn repeated_queries_agree() {
  let engine = engine();
  engine
    .build_index(vec![
      record("高血压患者饮食", "低盐低脂", &["高血压"], 1),
      record("糖尿病患者饮食", "控制糖分摄入", &["糖尿病"], 2),
      record("胃痛 反酸", "少食多餐", &["胃痛"], 3),
    ])
    .unwrap();

  for query in ["高血压吃什么", "最近反酸", "fever"] {
    let first = engine.match_query(query).unwrap();
    assert_eq!(engine.match_query(query).unwrap(), first);
  }
  assert_eq!(engine.stats().qa_count, 6);
}

#[test]
fn evaluation_accuracy_stays_in_range() {
  let engine = engine();
  let pairs = vec![
    LabeledPair::new("头痛怎么办", "建议休息").with_types("symptom", "advice"),
    LabeledPair::new("发烧怎么办", "多喝水").with_types("symptom", "advice"),
    LabeledPair::new("胃炎吃什么药", "遵医嘱服药").with_types("disease", "medicine"),
    LabeledPair::new("血压高怎么控制", "低盐饮食").with_types("disease", "advice"),
  ];

  for result in [engine.evaluate(&pairs), engine.evaluate_typed(&pairs)] {
    assert!(!result.is_degenerate());
    assert_eq!(result.total, 4);
    assert!((0.0..=100.0).contains(&result.accuracy));
    assert!(result.matched <= result.total);
  }
}
