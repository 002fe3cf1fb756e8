mod common;

use common::{media, post, TOP};
use truthcord_core::attachments::AttachmentLimits;
use truthcord_core::compose::{build_message, compose, Collaborators, ComposeSettings};
use truthcord_core::contract::{
    MockMediaFetcher, MockMediaHost, MockTranslator, TranslateError, TranslationLanguages,
};
use truthcord_core::governor::WORD_LIMIT_MARKER;
use truthcord_core::post::MediaKind;

fn untranslated() -> (MockTranslator, ComposeSettings) {
    let mut translator = MockTranslator::new();
    translator.expect_translate().never();
    (translator, ComposeSettings::default())
}

fn translated_settings() -> ComposeSettings {
    ComposeSettings {
        translation: Some(TranslationLanguages {
            from: "en".into(),
            to: "zh-Hans".into(),
        }),
        ..ComposeSettings::default()
    }
}

#[tokio::test]
async fn plain_post_is_top_line_plus_text() {
    let (translator, settings) = untranslated();
    let content = compose(&post("<p>Hello world</p>"), vec![], &translator, &settings).await;
    assert_eq!(content, format!("{TOP}Hello world"));
}

#[tokio::test]
async fn body_without_paragraph_markup_is_still_shown() {
    let (translator, settings) = untranslated();
    let content = compose(&post("Hello world<br>second line"), vec![], &translator, &settings).await;
    assert_eq!(content, format!("{TOP}Hello world\nsecond line"));
}

#[tokio::test]
async fn url_anchor_goes_to_the_links_block_after_the_body() {
    let (translator, settings) = untranslated();
    let p = post(r#"<p>Hello world <a href="https://x.com/foo">https://x.com/foo</a></p>"#);
    let content = compose(&p, vec![], &translator, &settings).await;
    assert_eq!(
        content,
        format!("{TOP}Hello world\n> -# [External link](https://x.com/foo)")
    );
}

#[tokio::test]
async fn empty_post_is_exactly_the_top_line() {
    let (translator, settings) = untranslated();
    let mut p = post("<p> </p>");
    p.reblog = Some(Box::new(post("")));
    p.quote = Some(Box::new(post("<p></p>")));
    let content = compose(&p, vec![], &translator, &settings).await;
    assert_eq!(content, TOP);
}

#[tokio::test]
async fn media_only_post_shows_attribution_and_links() {
    let mut translator = MockTranslator::new();
    translator.expect_translate().never();
    let settings = translated_settings();
    let p = post(r#"<p>RT <span class="h-card">@bob</span></p>"#);
    let content = compose(
        &p,
        vec![":small_blue_diamond: [Click here to view the image](https://cdn/x.jpg)".into()],
        &translator,
        &settings,
    )
    .await;
    assert_eq!(
        content,
        format!(
            "{TOP}-# 转发自 @bob\n> -# :small_blue_diamond: [Click here to view the image](https://cdn/x.jpg)"
        )
    );
}

#[tokio::test]
async fn reblog_text_wins_over_quote_text() {
    let (translator, settings) = untranslated();
    let mut p = post("<p>Main</p>");
    p.reblog = Some(Box::new(post("<p>Reblogged words</p>")));
    p.quote = Some(Box::new(post("<p>Quoted words</p>")));
    let content = compose(&p, vec![], &translator, &settings).await;
    assert!(content.contains("Reblogged words"));
    assert!(!content.contains("Quoted words"));
    assert_eq!(content, format!("{TOP}Main\n\nReblogged words"));
}

#[tokio::test]
async fn quote_text_shown_without_reblog() {
    let (translator, settings) = untranslated();
    let mut p = post(
        r#"<p>Agreed<span class="quote-inline"> RT: https://truthsocial.com/users/dave/statuses/9</span></p>"#,
    );
    p.quote = Some(Box::new(post("<p>Quoted words</p>")));
    let content = compose(&p, vec![], &translator, &settings).await;
    assert_eq!(
        content,
        format!(
            "{TOP}Agreed\n\n-# Quoted from [dave](https://truthsocial.com/users/dave/statuses/9)\n\nQuoted words"
        )
    );
}

#[tokio::test]
async fn long_post_is_bounded_and_links_survive() {
    let (translator, settings) = untranslated();
    let body = format!("<p>{}</p>", "lorem ipsum ".repeat(1000));
    let link = ":small_blue_diamond: [Click here to watch the video](https://cdn.example.com/v.mp4)";
    let content = compose(&post(&body), vec![link.into()], &translator, &settings).await;

    assert!(content.chars().count() <= settings.character_limit);
    assert!(content.starts_with(TOP));
    assert!(content.ends_with(&format!("{WORD_LIMIT_MARKER}\n> -# {link}")));
}

#[tokio::test]
async fn output_never_exceeds_the_ceiling() {
    let (translator, _) = untranslated();
    for limit in [300usize, 900, 1800, 4000] {
        let settings = ComposeSettings {
            character_limit: limit,
            ..ComposeSettings::default()
        };
        for words in [1usize, 50, 400, 3000] {
            let body = format!("<p>{}</p>", "字 word ".repeat(words));
            let links: Vec<String> = (0..words.min(40))
                .map(|i| format!("[link {i}](https://example.com/{i})"))
                .collect();
            let content = compose(&post(&body), links, &translator, &settings).await;
            assert!(
                content.chars().count() <= limit,
                "limit {limit}, words {words}: got {}",
                content.chars().count()
            );
        }
    }
}

#[tokio::test]
async fn translated_post_shows_translation_then_original() {
    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .withf(|texts, languages| {
            texts.len() == 3
                && texts[0] == "Hello"
                && texts[1].is_empty()
                && texts[2].is_empty()
                && languages.to == "zh-Hans"
        })
        .times(1)
        .returning(|_, _| Ok(vec!["你好".into(), String::new(), String::new()]));

    let content = compose(&post("<p>Hello</p>"), vec![], &translator, &translated_settings()).await;
    assert_eq!(
        content,
        format!("{TOP}你好\n\n-# :small_blue_diamond:原文：\n-# Hello")
    );
}

#[tokio::test]
async fn translated_repost_with_quote_layout() {
    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .returning(|texts, _| Ok(texts.iter().map(|t| if t.is_empty() { String::new() } else { format!("T[{t}]") }).collect()));

    let mut p = post(r#"<p>Look<span class="quote-inline">https://truthsocial.com/@erin/5</span></p>"#);
    p.reblog = Some(Box::new(post("<p>Inner</p>")));
    p.quote = Some(Box::new(post("<p>Q</p>")));

    let content = compose(&p, vec![], &translator, &translated_settings()).await;
    assert_eq!(
        content,
        format!(
            "{TOP}T[Look]\n\n\
             -# 引用自 [erin](https://truthsocial.com/@erin/5)\n\
             > T[Inner]\n\n\
             > T[Q]\n\n\
             -# :small_blue_diamond:原文：\n\
             -# Look\n\n\
             -# Quoted from [erin](https://truthsocial.com/@erin/5)\n\
             > -# Inner\n\
             > -# Q"
        )
    );
}

#[tokio::test]
async fn translation_failure_falls_back_with_notice() {
    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .returning(|_, _| Err(TranslateError::Request("timed out".into())));

    let content = compose(&post("<p>Hello</p>"), vec![], &translator, &translated_settings()).await;
    assert_eq!(
        content,
        format!(
            "{TOP}-# :small_orange_diamond: Translation failed: translation request failed: timed out\nHello"
        )
    );
}

#[tokio::test]
async fn short_translation_batch_is_rejected() {
    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .returning(|_, _| Ok(vec!["only one".into()]));

    let content = compose(&post("<p>Hello</p>"), vec![], &translator, &translated_settings()).await;
    assert!(content.contains("Translation failed: expected 3 translations, got 1"));
    assert!(content.ends_with("\nHello"));
    assert!(!content.contains("only one"));
}

#[tokio::test]
async fn build_message_joins_resolver_and_composer() {
    let mut p = post(r#"<p>Pics <a href="https://news.example/a">https://news.example/a</a></p>"#);
    p.media_attachments = vec![
        media(MediaKind::Image, "https://cdn.example.com/small.png"),
        media(MediaKind::Video, "https://cdn.example.com/huge.mp4"),
    ];

    let mut fetcher = MockMediaFetcher::new();
    fetcher.expect_head_size().returning(|url| {
        Ok(if url.ends_with("huge.mp4") { 20 * 1024 * 1024 } else { 4 })
    });
    fetcher.expect_download().times(1).returning(|_| Ok(vec![9u8; 4]));
    let host = MockMediaHost::new();
    let mut translator = MockTranslator::new();
    translator.expect_translate().never();

    let message = build_message(
        &p,
        Collaborators {
            fetcher: &fetcher,
            host: &host,
            translator: &translator,
        },
        &ComposeSettings::default(),
        &AttachmentLimits::default(),
    )
    .await;

    assert_eq!(message.files.len(), 1);
    assert_eq!(message.files[0].filename, "small.png");
    assert_eq!(
        message.content,
        format!(
            "{TOP}Pics\n> -# :small_blue_diamond: [Click here to watch the video](https://cdn.example.com/huge.mp4) ｜ [External link](https://news.example/a)"
        )
    );
}
