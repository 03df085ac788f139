// Static usage page served verbatim on the root path.

pub const DOCS: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Registry Gateway</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; max-width: 42rem; margin: 3rem auto; padding: 0 1rem; color: #24292f; }
  h1 { font-size: 1.6rem; }
  code, pre { background: #f6f8fa; border-radius: 6px; font-family: ui-monospace, SFMono-Regular, Menlo, monospace; }
  code { padding: 0.15em 0.35em; }
  pre { padding: 0.8em 1em; overflow-x: auto; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border: 1px solid #d0d7de; padding: 0.4em 0.7em; text-align: left; }
</style>
</head>
<body>
<h1>Registry Gateway</h1>
<p>This endpoint is a reverse proxy in front of several public
container-image registries. Pick the hostname matching the registry you
want and use it in place of the registry's own address.</p>

<h2>Pulling through the gateway</h2>
<pre>docker pull docker.example.com/library/nginx:latest
docker pull ghcr.example.com/my-org/my-image:latest</pre>

<p>Unqualified Docker Hub images work too; the gateway fills in the
<code>library/</code> namespace:</p>
<pre>docker pull docker.example.com/nginx:latest</pre>

<h2>Registry hostnames</h2>
<table>
<tr><th>Hostname</th><th>Upstream registry</th></tr>
<tr><td><code>docker.example.com</code></td><td>registry-1.docker.io</td></tr>
<tr><td><code>quay.example.com</code></td><td>quay.io</td></tr>
<tr><td><code>gcr.example.com</code></td><td>gcr.io</td></tr>
<tr><td><code>k8s-gcr.example.com</code></td><td>k8s.gcr.io</td></tr>
<tr><td><code>k8s.example.com</code></td><td>registry.k8s.io</td></tr>
<tr><td><code>ghcr.example.com</code></td><td>ghcr.io</td></tr>
<tr><td><code>cloudsmith.example.com</code></td><td>docker.cloudsmith.io</td></tr>
</table>

<p>Requests to a hostname not in the table answer with a JSON listing of
the configured routes.</p>
</body>
</html>
"#;
