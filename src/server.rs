//! HTTP trigger: `GET /` runs one conversion and returns the video.
//!
//! Requests are served one at a time from a single accept loop, so two
//! conversions never run at once.

use crate::convert::RenderedVideo;
use crate::Result;
use log::{error, info};
use std::io::Cursor;
use tiny_http::{Header, Method, Request, Response, Server};

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";
pub const ATTACHMENT_DISPOSITION: &str = "attachment; filename=\"lottie.mp4\"";
pub const FAILURE_BODY: &str = "Failed to generate video";

type HttpResponse = Response<Cursor<Vec<u8>>>;

/// Serve requests from `server` until it is unblocked, running `convert` for
/// every `GET /`.
pub fn serve<F>(server: &Server, mut convert: F)
where
    F: FnMut() -> Result<RenderedVideo>,
{
    for request in server.incoming_requests() {
        let response = route(&request, &mut convert);
        let status = response.status_code().0;
        if let Err(e) = request.respond(response) {
            error!("failed to send response ({}): {}", status, e);
        }
    }
    info!("HTTP server stopped");
}

fn route<F>(request: &Request, convert: &mut F) -> HttpResponse
where
    F: FnMut() -> Result<RenderedVideo>,
{
    info!("{} {}", request.method(), request.url());
    dispatch(request.method(), request.url(), convert)
}

/// Route one request line. Only the path takes part in matching; any query
/// string is ignored.
fn dispatch<F>(method: &Method, url: &str, convert: &mut F) -> HttpResponse
where
    F: FnMut() -> Result<RenderedVideo>,
{
    if request_path(url) != "/" {
        return Response::from_string("Not Found").with_status_code(404);
    }
    if *method != Method::Get {
        return Response::from_string("Method Not Allowed").with_status_code(405);
    }

    video_response(convert())
}

fn request_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Map a conversion outcome onto the HTTP response
pub fn video_response(result: Result<RenderedVideo>) -> HttpResponse {
    match result {
        Ok(video) => {
            info!("serving {} bytes ({} frames)", video.bytes.len(), video.frame_count);
            let mut response = Response::from_data(video.bytes);
            for (name, value) in [
                ("Content-Type", VIDEO_CONTENT_TYPE),
                ("Content-Disposition", ATTACHMENT_DISPOSITION),
            ] {
                match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                    Ok(h) => response.add_header(h),
                    Err(()) => error!("invalid header {}: {}", name, value),
                }
            }
            response
        }
        Err(e) => {
            error!("{}", e);
            Response::from_string(FAILURE_BODY).with_status_code(500)
        }
    }
}
