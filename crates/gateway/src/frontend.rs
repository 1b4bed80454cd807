//! Embedded demo page for the plain-text agent stream.
//!
//! The page is compiled into the binary so the gateway stays a single
//! deployable file.

use axum::{Router, response::Html, routing::get};

const AGENT_UI_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Stepwise Agent 流式演示</title>
</head>
<body>
    <h1>Stepwise Agent 推理演示</h1>
    <input type="text" id="query" placeholder="请输入你的请求" size="40"/>
    <button onclick="runAgent()">运行</button>
    <pre id="output" style="background:#f0f0f0;padding:10px;"></pre>

    <script>
    async function runAgent() {
        const query = document.getElementById("query").value;
        const output = document.getElementById("output");
        output.textContent = "正在加载...\n";
        const response = await fetch(`/agent/stream?q=${encodeURIComponent(query)}`);
        const reader = response.body.getReader();
        const decoder = new TextDecoder("utf-8");
        let result = "";
        while (true) {
            const { done, value } = await reader.read();
            if (done) break;
            result += decoder.decode(value, { stream: true });
            output.textContent = result;
        }
    }
    </script>
</body>
</html>
"#;

/// Routes serving the embedded page; state-agnostic so it merges into any router.
pub fn frontend_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/agent/ui", get(agent_ui_handler))
}

async fn agent_ui_handler() -> Html<&'static str> {
    Html(AGENT_UI_HTML)
}
