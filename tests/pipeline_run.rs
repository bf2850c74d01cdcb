// tests/pipeline_run.rs
// End-to-end pipeline runs against a fixture transport; no live network.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, FixedOffset, TimeZone, Utc};

use news_clipper::fetch::parse::ResponseFormat;
use news_clipper::fetch::FeedTransport;
use news_clipper::{
    DateGranularity, FetchMode, Pipeline, RunOptions, TimeWindow, TrustConfig,
};

fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

struct FixtureTransport {
    pages: Vec<(&'static str, String)>,
}

#[async_trait]
impl FeedTransport for FixtureTransport {
    async fn fetch_page(
        &self,
        query: &str,
        _start: usize,
        _count: usize,
    ) -> Result<(String, ResponseFormat)> {
        for (needle, body) in &self.pages {
            if query.contains(needle) {
                if body.as_str() == "ERROR" {
                    bail!("simulated outage");
                }
                return Ok((body.clone(), ResponseFormat::Rss));
            }
        }
        Ok((
            "<rss><channel><title>t</title></channel></rss>".to_string(),
            ResponseFormat::Rss,
        ))
    }
}

fn item(title: &str, url: &str, pub_date: &str, source: Option<(&str, &str)>) -> String {
    let source_tag = source
        .map(|(u, name)| format!(r#"<source url="{u}">{name}</source>"#))
        .unwrap_or_default();
    format!(
        "<item><title>{title}</title><link>{url}</link>\
         <pubDate>{pub_date}</pubDate><description>요약 {title}</description>{source_tag}</item>"
    )
}

fn rss(items: &[String]) -> String {
    format!(
        "<rss><channel><title>검색</title>{}</channel></rss>",
        items.concat()
    )
}

fn trust() -> TrustConfig {
    let mut m = BTreeMap::new();
    m.insert(
        "한국경제".to_string(),
        vec!["한국경제".into(), "hankyung.com".into()],
    );
    m.insert(
        "연합뉴스".to_string(),
        vec!["연합뉴스".into(), "yna.co.kr".into()],
    );
    TrustConfig::new(m).unwrap()
}

fn may_window() -> TimeWindow {
    TimeWindow::new(
        kst().with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        kst().with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap(),
    )
    .unwrap()
}

fn options() -> RunOptions {
    RunOptions {
        dedup_priority: vec!["한국경제".to_string(), "연합뉴스".to_string()],
        ..RunOptions::default()
    }
}

fn pipeline(pages: Vec<(&'static str, String)>) -> Pipeline<FixtureTransport> {
    Pipeline::new(FixtureTransport { pages }).with_politeness_delay(Duration::ZERO)
}

#[tokio::test]
async fn full_run_counts_every_stage() {
    let pages = vec![(
        "삼성",
        rss(&[
            item(
                "삼성전자 실적 발표",
                "https://www.hankyung.com/a/1",
                "Tue, 07 May 2024 03:00:00 GMT",
                Some(("https://www.hankyung.com", "한국경제")),
            ),
            // same story, same url, collapses
            item(
                "삼성전자 실적 발표",
                "https://www.hankyung.com/a/1",
                "Tue, 07 May 2024 04:00:00 GMT",
                Some(("https://www.hankyung.com", "한국경제")),
            ),
            // outside the window
            item(
                "작년 기사",
                "https://www.yna.co.kr/b/1",
                "Mon, 03 Apr 2023 03:00:00 GMT",
                Some(("https://www.yna.co.kr", "연합뉴스")),
            ),
            // untrusted publisher
            item(
                "블로그 글",
                "https://someblog.example.com/p/1",
                "Tue, 07 May 2024 05:00:00 GMT",
                None,
            ),
        ]),
    )];
    let t = trust();
    let report = pipeline(pages)
        .run(&["삼성".to_string()], &may_window(), Some(&t), &options())
        .await
        .unwrap();

    assert_eq!(report.counts.collected, 4);
    assert_eq!(report.counts.date_filtered, 3);
    assert_eq!(report.counts.trust_filtered, 2);
    assert_eq!(report.counts.deduped, 1);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].publisher.as_deref(), Some("한국경제"));
}

#[tokio::test]
async fn exact_duplicates_across_search_terms_collapse() {
    let shared = item(
        "같은 사건 보도",
        "https://news.example.com/a/1",
        "Tue, 07 May 2024 03:00:00 GMT",
        Some(("https://www.yna.co.kr", "연합뉴스")),
    );
    let pages = vec![("삼성", rss(&[shared.clone()])), ("반도체", rss(&[shared]))];
    let t = trust();
    let report = pipeline(pages)
        .run(
            &["삼성".to_string(), "반도체".to_string()],
            &may_window(),
            Some(&t),
            &options(),
        )
        .await
        .unwrap();
    assert_eq!(report.counts.collected, 2);
    assert_eq!(report.candidates.len(), 1);
}

#[tokio::test]
async fn failing_keyword_does_not_abort_the_run() {
    let pages = vec![
        ("불량", "ERROR".to_string()),
        (
            "삼성",
            rss(&[item(
                "삼성 기사",
                "https://www.yna.co.kr/a/1",
                "Tue, 07 May 2024 03:00:00 GMT",
                Some(("https://www.yna.co.kr", "연합뉴스")),
            )]),
        ),
    ];
    let t = trust();
    let report = pipeline(pages)
        .run(
            &["불량".to_string(), "삼성".to_string()],
            &may_window(),
            Some(&t),
            &options(),
        )
        .await
        .unwrap();
    assert_eq!(report.counts.collected, 1);
    assert_eq!(report.candidates.len(), 1);
}

#[tokio::test]
async fn total_failure_is_a_result_not_an_error() {
    let pages = vec![("삼성", "ERROR".to_string())];
    let t = trust();
    let report = pipeline(pages)
        .run(&["삼성".to_string()], &may_window(), Some(&t), &options())
        .await
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(report.counts.collected, 0);
    assert_eq!(report.counts.deduped, 0);
}

#[tokio::test]
async fn invalid_inputs_fail_before_any_fetch() {
    let p = pipeline(vec![]);
    let t = trust();
    assert!(p
        .run(&[], &may_window(), Some(&t), &options())
        .await
        .is_err());
    assert!(p
        .run(
            &["삼성".to_string()],
            &may_window(),
            Some(&t),
            &RunOptions {
                limit_per_query: 0,
                ..options()
            },
        )
        .await
        .is_err());
}

#[tokio::test]
async fn undateable_record_defaults_to_now_and_survives_open_ended_window() {
    let pages = vec![(
        "삼성",
        rss(&[item(
            "날짜가 이상한 기사",
            "https://www.yna.co.kr/a/9",
            "not-a-date",
            Some(("https://www.yna.co.kr", "연합뉴스")),
        )]),
    )];
    let now = Utc::now().with_timezone(&kst());
    let window = TimeWindow::new(now - ChronoDuration::hours(1), now + ChronoDuration::hours(1))
        .unwrap();
    let t = trust();
    let report = pipeline(pages)
        .run(&["삼성".to_string()], &window, Some(&t), &options())
        .await
        .unwrap();
    assert_eq!(report.candidates.len(), 1);
    assert!(report.candidates[0].published_at.is_some());
}

#[tokio::test]
async fn candidate_list_is_bounded_and_stamped_with_category() {
    let items: Vec<String> = (0..6)
        .map(|i| {
            item(
                &format!("서로 다른 기사 주제 {i}"),
                &format!("https://www.yna.co.kr/a/{i}"),
                "Tue, 07 May 2024 03:00:00 GMT",
                Some(("https://www.yna.co.kr", "연합뉴스")),
            )
        })
        .collect();
    let pages = vec![("삼성", rss(&items))];
    let t = trust();
    let opts = RunOptions {
        max_candidates: 3,
        category: Some("주요기업".to_string()),
        ..options()
    };
    let report = pipeline(pages)
        .run(&["삼성".to_string()], &may_window(), Some(&t), &opts)
        .await
        .unwrap();
    assert_eq!(report.candidates.len(), 3);
    assert!(report
        .candidates
        .iter()
        .all(|r| r.category.as_deref() == Some("주요기업")));
}

#[tokio::test]
async fn or_group_mode_issues_one_query_for_the_whole_set() {
    let pages = vec![(
        " OR ",
        rss(&[item(
            "묶음 검색 결과",
            "https://www.yna.co.kr/a/1",
            "Tue, 07 May 2024 03:00:00 GMT",
            Some(("https://www.yna.co.kr", "연합뉴스")),
        )]),
    )];
    let opts = RunOptions {
        mode: FetchMode::OrGroup,
        granularity: DateGranularity::DateOnly,
        ..options()
    };
    let report = pipeline(pages)
        .run(
            &["삼성".to_string(), "SK".to_string()],
            &may_window(),
            None,
            &opts,
        )
        .await
        .unwrap();
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].search_term, "삼성 OR SK");
}
