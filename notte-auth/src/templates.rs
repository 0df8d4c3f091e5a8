//! HTML pages served by the login server.
//!
//! Pages carry `{{name}}` placeholders filled by [`render`]. Values are HTML
//! escaped and only ever placed in element content or attributes; scripts
//! read them back from `<meta>` tags.

/// Shared stylesheet, inlined into every page.
const STYLE: &str = r#"
    :root {
        --bg: #0f1115;
        --panel: #171a21;
        --border: #2a2f3a;
        --text: #e6e8ee;
        --muted: #9aa3b2;
        --accent: #6c8cff;
        --ok: #3ecf8e;
        --err: #ff6b6b;
    }
    * { box-sizing: border-box; }
    body {
        margin: 0;
        min-height: 100vh;
        display: flex;
        align-items: center;
        justify-content: center;
        background: var(--bg);
        color: var(--text);
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    }
    .card {
        width: 100%;
        max-width: 440px;
        padding: 32px;
        background: var(--panel);
        border: 1px solid var(--border);
        border-radius: 12px;
    }
    h1 { margin: 0 0 8px; font-size: 22px; }
    p { margin: 0 0 20px; color: var(--muted); line-height: 1.5; }
    label { display: block; margin-bottom: 6px; font-size: 13px; color: var(--muted); }
    input {
        width: 100%;
        padding: 10px 12px;
        margin-bottom: 16px;
        background: var(--bg);
        color: var(--text);
        border: 1px solid var(--border);
        border-radius: 8px;
        font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
    }
    .row { display: flex; gap: 8px; }
    button, .btn {
        flex: 1;
        display: inline-block;
        padding: 10px 14px;
        text-align: center;
        text-decoration: none;
        border: 1px solid var(--border);
        border-radius: 8px;
        background: transparent;
        color: var(--text);
        cursor: pointer;
        font-size: 14px;
    }
    .primary { background: var(--accent); border-color: var(--accent); color: #fff; }
    .divider { margin: 24px 0; text-align: center; color: var(--muted); font-size: 12px; }
    .status { display: none; margin-top: 16px; padding: 10px 12px; border-radius: 8px; font-size: 14px; }
    .status.ok { display: block; color: var(--ok); border: 1px solid var(--ok); }
    .status.err { display: block; color: var(--err); border: 1px solid var(--err); }
    .icon { font-size: 40px; margin-bottom: 12px; }
"#;

/// Setup page: paste a key or continue to the console.
pub const SETUP_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="csrf-token" content="{{csrf_token}}">
    <title>Notte CLI Setup</title>
    <style>{{style}}</style>
</head>
<body>
    <div class="card">
        <h1>Connect the Notte CLI</h1>
        <p>Sign in through the console to hand a key to this terminal, or paste an existing API key below.</p>

        <a class="btn primary" id="consoleLink" href="{{console_auth_url}}">Continue with Notte Console</a>

        <div class="divider">or paste an API key</div>

        <form id="setupForm" autocomplete="off">
            <label for="apiKey">API key</label>
            <input id="apiKey" name="api_key" type="password" placeholder="sk-..." required>
            <div class="row">
                <button type="button" id="testBtn">Test connection</button>
                <button type="submit" id="submitBtn" class="primary">Save</button>
            </div>
        </form>

        <div class="status" id="status"></div>
    </div>

    <script>
        const csrfToken = document.querySelector('meta[name="csrf-token"]').content;
        const form = document.getElementById('setupForm');
        const testBtn = document.getElementById('testBtn');
        const submitBtn = document.getElementById('submitBtn');
        const status = document.getElementById('status');

        function showStatus(ok, message) {
            status.className = 'status ' + (ok ? 'ok' : 'err');
            status.textContent = message;
        }

        async function post(path, apiKey) {
            const response = await fetch(path, {
                method: 'POST',
                headers: {
                    'Content-Type': 'application/json',
                    'X-CSRF-Token': csrfToken
                },
                body: JSON.stringify({ api_key: apiKey })
            });
            return response.json();
        }

        function currentKey() {
            const apiKey = document.getElementById('apiKey').value.trim();
            if (!apiKey) {
                showStatus(false, 'Enter an API key first.');
            }
            return apiKey;
        }

        testBtn.addEventListener('click', async () => {
            const apiKey = currentKey();
            if (!apiKey) return;
            testBtn.disabled = true;
            try {
                const result = await post('/validate', apiKey);
                showStatus(result.success, result.success ? result.message : result.error);
            } catch (err) {
                showStatus(false, 'Request failed: ' + err);
            } finally {
                testBtn.disabled = false;
            }
        });

        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            const apiKey = currentKey();
            if (!apiKey) return;
            submitBtn.disabled = true;
            try {
                const result = await post('/submit', apiKey);
                if (result.success) {
                    window.location.href = '/success';
                    return;
                }
                showStatus(false, result.error);
            } catch (err) {
                showStatus(false, 'Request failed: ' + err);
            }
            submitBtn.disabled = false;
        });
    </script>
</body>
</html>
"#;

/// Terminal page. Tells the CLI it may shut the server down.
pub const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Connected - Notte CLI</title>
    <style>{{style}}</style>
</head>
<body>
    <div class="card">
        <div class="icon">&#10003;</div>
        <h1>You're connected</h1>
        <p>Your API key is stored in the system keychain. You can close this tab and return to the terminal.</p>
    </div>
    <script>
        fetch('/complete', { method: 'POST' }).catch(() => {});
    </script>
</body>
</html>
"#;

/// Landing page for the console redirect.
///
/// The console puts `token` and `state` in the URL fragment, which browsers
/// never send to the server, so this page extracts them and posts them back.
pub const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="expected-state" content="{{expected_state}}">
    <title>Authenticating - Notte CLI</title>
    <style>{{style}}</style>
</head>
<body>
    <div class="card">
        <div class="icon" id="statusIcon">&#8230;</div>
        <h1 id="title">Finishing sign-in</h1>
        <p id="message">Verifying your API key with Notte.</p>
        <div class="status" id="errorDetail"></div>
        <a class="btn" id="tryAgain" href="/" style="display: none">Try again</a>
    </div>
    <script>
        (async () => {
            const expectedState = document.querySelector('meta[name="expected-state"]').content;
            const statusIcon = document.getElementById('statusIcon');
            const title = document.getElementById('title');
            const message = document.getElementById('message');
            const errorDetail = document.getElementById('errorDetail');
            const tryAgain = document.getElementById('tryAgain');

            function showSuccess() {
                statusIcon.innerHTML = '&#10003;';
                title.textContent = "You're connected";
                message.textContent = 'Your API key is stored in the system keychain. You can close this tab.';
                fetch('/complete', { method: 'POST' }).catch(() => {});
            }

            function showError(err) {
                statusIcon.innerHTML = '&#10007;';
                title.textContent = 'Sign-in failed';
                message.textContent = 'The CLI could not use the key from the console.';
                errorDetail.className = 'status err';
                errorDetail.textContent = err;
                tryAgain.style.display = 'inline-block';
            }

            const params = new URLSearchParams(window.location.hash.slice(1));
            const token = params.get('token');
            const state = params.get('state');
            history.replaceState(null, '', window.location.pathname);

            if (!token) {
                showError('No token was returned by the console.');
                return;
            }
            if (state !== expectedState) {
                showError('The sign-in request did not match this session.');
                return;
            }

            try {
                const res = await fetch('/callback', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ token, state })
                });
                const data = await res.json();
                if (data.success) {
                    showSuccess();
                } else {
                    showError(data.error || 'Unknown error');
                }
            } catch (err) {
                showError('Request failed: ' + err);
            }
        })();
    </script>
</body>
</html>
"#;

/// Fills `{{name}}` placeholders with HTML-escaped values.
///
/// `{{style}}` is always available and expands to the shared stylesheet.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut page = template.replace("{{style}}", STYLE);
    for (name, value) in values {
        page = page.replace(&format!("{{{{{name}}}}}"), &escape_html(value));
    }
    page
}

/// Escapes the characters significant in HTML content and attributes.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
