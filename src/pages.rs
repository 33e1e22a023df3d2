// src/pages.rs
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

use crate::render::escape;

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Poll {
        code: u64,
        title: String,
        refresh: String,
    },
    Unknown {
        object_name: &'static str,
        object_value: String,
    },
    Error {
        message: String,
    },
}

impl Page {
    pub fn status(&self) -> StatusCode {
        match self {
            Page::Poll { .. } | Page::Unknown { .. } => StatusCode::OK,
            Page::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Page::Poll { code, title, refresh } => layout(
                &format!("Poll {}", code),
                &format!(
                    r##"<h1>{title}</h1>
<p class="refresh">Last refresh: <span>{refresh}</span></p>
<dl id="summary">
  <dt>Poll start</dt><dd id="poll_start"></dd>
  <dt>Poll end</dt><dd id="poll_end"></dd>
  <dt>Last vote</dt><dd id="last_vote"></dd>
  <dt>Voters</dt><dd id="num_voters"></dd>
  <dt>Total stake (MKR)</dt><dd id="approval"></dd>
  <dt>Not valid</dt><dd><span id="not_valid_num"></span> / <span id="not_valid_stake"></span></dd>
  <dt>Operations</dt><dd id="operations_num"></dd>
</dl>
<div id="options"></div>
<table id="operations" class="table">
  <thead><tr><th>Time</th><th>Address</th><th>Proxy</th><th>Operation</th><th>Option</th><th>Approval</th></tr></thead>
  <tbody></tbody>
</table>
<p id="failure" hidden></p>
<script>
fetch("/data/poll/{code}")
  .then((response) => response.json())
  .then((payload) => {{
    if (payload.status !== "success") {{
      const failure = document.getElementById("failure");
      failure.textContent = payload.data;
      failure.hidden = false;
      return;
    }}
    const data = payload.data;
    for (const key of ["poll_start", "poll_end", "last_vote", "num_voters", "approval",
                       "not_valid_num", "not_valid_stake", "operations_num"]) {{
      document.getElementById(key).textContent = data[key];
    }}
    document.getElementById("options").innerHTML = data.options;
    const body = document.querySelector("#operations tbody");
    for (const op of data.operations) {{
      const row = body.insertRow();
      for (const key of ["TIME", "ADDRESS", "PROXY", "OPERATION", "OPTION", "APPROVAL"]) {{
        row.insertCell().innerHTML = op[key];
      }}
    }}
  }});
</script>"##,
                    title = escape(title),
                    refresh = escape(refresh),
                ),
            ),
            Page::Unknown { object_name, object_value } => layout(
                &format!("Unknown {}", object_name),
                &format!(
                    "<h1>Unknown {}</h1>\n<p>No {} matches <code>{}</code>.</p>",
                    escape(object_name),
                    escape(object_name),
                    escape(object_value)
                ),
            ),
            Page::Error { message } => layout(
                "Error",
                &format!(
                    "<h1>Something went wrong</h1>\n<pre class=\"error\">{}</pre>",
                    escape(message)
                ),
            ),
        }
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status(), Html(self.render())).into_response()
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}
