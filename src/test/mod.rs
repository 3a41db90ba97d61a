mod decode_log;
mod ion_reader;
mod session;
mod structure;

use crate::ion::{Element, IonBuilder};

/// `{timestamp, data: {seq}}` 形式的消息
pub(crate) fn message(ts: i64, seq: i64) -> Element {
    Element::structure([
        ("timestamp", Element::Int(ts)),
        ("data", Element::structure([("seq", Element::Int(seq))])),
    ])
}

pub(crate) fn topic(name: &str, topic_type: &str, timestamps: &[i64]) -> Element {
    Element::structure([
        ("topicName", Element::string(name)),
        ("topicType", Element::string(topic_type)),
        (
            "messages",
            Element::list(
                timestamps
                    .iter()
                    .enumerate()
                    .map(|(i, ts)| message(*ts, i as i64)),
            ),
        ),
    ])
}

/// 一条会话记录 + 一个 `{topics: [...]}` 顶层值
pub(crate) fn log_bytes(topics: Vec<Element>) -> Vec<u8> {
    IonBuilder::new()
        .with(Element::structure([
            ("sessionId", Element::string("session-1")),
            ("startTime", Element::Int(1_000)),
        ]))
        .with(Element::structure([("topics", Element::List(topics))]))
        .finish()
}
