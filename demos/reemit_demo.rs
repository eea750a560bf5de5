//! Demonstrates re-emitting a multipart payload with one part dropped and
//! one part's body rewritten, streaming the result rather than buffering
//! it. Run with `cargo run --example reemit_demo`.

use streamform::{
    get_readable_formdata_stream, ByteSource, FilterFn, FilterOutcome, FormDataStreamOptions,
    TransformFn, TransformOutcome,
};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let payload: &[u8] = b"\r\n--XBoundary\r\n\
Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
hello there\r\n\
--XBoundary\r\n\
Content-Disposition: form-data; name=\"secret\"\r\n\r\n\
drop me\r\n\
--XBoundary\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"greeting.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
hi\r\n\
--XBoundary--";

    let source: Box<dyn ByteSource> = Box::new(streamform::SliceSource::chunked(payload, 7));

    let filter: FilterFn = Box::new(|part| FilterOutcome {
        keep: part.name != "secret",
        stop: false,
    });

    let transform: TransformFn = Box::new(|part| {
        Box::pin(async move {
            if part.name != "file" {
                return Ok(TransformOutcome {
                    part: Some(part),
                    stop: false,
                });
            }
            let name = part.name.clone();
            let filename = part.filename.clone();
            let content_type = part.content_type.clone();
            let body = part.collect_body().await?;
            let upper = String::from_utf8_lossy(&body).to_uppercase();
            Ok(TransformOutcome {
                part: Some(streamform::Part {
                    name,
                    filename,
                    content_type,
                    content_length: None,
                    content_transfer_encoding: None,
                    header_lines: None,
                    extra_headers: Default::default(),
                    data: streamform::PartData::Eager(upper.into_bytes().into()),
                }),
                stop: false,
            })
        })
    });

    let (mut out, boundary) = get_readable_formdata_stream(FormDataStreamOptions {
        content_type: "multipart/form-data; boundary=XBoundary",
        source,
        output_boundary: None,
        filter: Some(filter),
        transform: Some(transform),
    })
    .expect("valid content type");

    println!("output boundary: {}", boundary);

    let mut rendered = Vec::new();
    while let Some(chunk) = out.next_chunk().await.expect("next_chunk") {
        rendered.extend_from_slice(&chunk);
    }

    print!("{}", String::from_utf8_lossy(&rendered));
}
