use crate::activity::node::{GroupKind, NodeKind, RequestRecord};
use crate::activity::tree::{ActivityTree, NodeId};
use crate::common::error::AppError;
use crate::common::utils::{find_header, format_timestamp};
use crate::session::har_model::{
    HarContent, HarCreator, HarEntry, HarHeader, HarLog, HarLogContent, HarPostData,
    HarQueryString, HarRequest, HarResponse, HarTimings,
};
use std::io::Write;

/// Label/value pairs of the `Headers` group under the request's reply
fn reply_headers(tree: &ActivityTree, request: NodeId) -> Vec<HarHeader> {
    let reply = tree
        .children(request)
        .iter()
        .copied()
        .find(|&child| matches!(tree.node(child).map(|n| &n.kind), Some(NodeKind::Reply)));
    let Some(reply) = reply else {
        return Vec::new();
    };
    tree.children(reply)
        .iter()
        .filter(|&&child| {
            matches!(
                tree.node(child).map(|n| &n.kind),
                Some(NodeKind::Group(GroupKind::Headers))
            )
        })
        .flat_map(|&group| tree.children(group).iter())
        .filter_map(|&leaf| match tree.node(leaf).map(|n| &n.kind) {
            Some(NodeKind::Detail(pair)) => Some(HarHeader {
                name: pair.label.clone(),
                value: pair.value.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn record_to_har_entry(tree: &ActivityTree, node: NodeId, record: &RequestRecord) -> HarEntry {
    let elapsed = record.elapsed_ms.unwrap_or(0) as f64;
    let response_headers = reply_headers(tree, node);

    let post_data = record.method.carries_body().then(|| HarPostData {
        mime_type: find_header(&record.headers, "Content-Type")
            .unwrap_or_default()
            .to_string(),
        text: record.body_text(),
    });

    let status = if record.status.has_reply() {
        record.http_status.map(i32::from).unwrap_or(0)
    } else {
        0
    };

    HarEntry {
        started_date_time: format_timestamp(record.started_at),
        time: elapsed,
        request: HarRequest {
            method: record.method.to_string(),
            url: record.url.to_string(),
            http_version: "HTTP/1.1".to_string(),
            cookies: vec![],
            headers: record
                .headers
                .iter()
                .map(|h| HarHeader {
                    name: h.name.clone(),
                    value: h.value.clone(),
                })
                .collect(),
            query_string: record
                .query
                .iter()
                .map(|q| HarQueryString {
                    name: q.name.clone(),
                    value: q.value.clone(),
                })
                .collect(),
            post_data,
            headers_size: -1,
            body_size: if record.method.carries_body() {
                record.body.len() as i64
            } else {
                0
            },
        },
        response: HarResponse {
            status,
            status_text: String::new(),
            http_version: "HTTP/1.1".to_string(),
            cookies: vec![],
            headers: response_headers,
            content: HarContent {
                size: record.progress.map(|(received, _)| received).unwrap_or(0),
                mime_type: record.content_type.clone(),
            },
            redirect_url: String::new(),
            headers_size: -1,
            body_size: -1,
        },
        cache: serde_json::Value::Object(Default::default()),
        timings: HarTimings {
            send: 0.0,
            wait: elapsed,
            receive: 0.0,
        },
        comment: Some(record.status.to_string()),
    }
}

/// HAR view of every retained request, oldest first
pub fn snapshot(tree: &ActivityTree) -> HarLog {
    let entries = tree
        .requests()
        .iter()
        .filter_map(|&node| {
            tree.record(node)
                .map(|record| record_to_har_entry(tree, node, record))
        })
        .collect();

    HarLog {
        log: HarLogContent {
            version: "1.2".to_string(),
            creator: HarCreator {
                name: "netscope".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            entries,
        },
    }
}

pub fn export_har<W: Write>(writer: W, tree: &ActivityTree) -> Result<(), AppError> {
    let har = snapshot(tree);
    serde_json::to_writer_pretty(writer, &har)?;
    log::info!("[Session] Exported {} requests to HAR", har.log.entries.len());
    Ok(())
}
