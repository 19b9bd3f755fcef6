// Playlist rewriter: rebases same-directory origin references onto the local
// cache. Deliberately a line-oriented text transform rather than a full HLS
// parser; the contract is prefix substitution plus reference extraction, and
// it assumes the playlist only references same-directory resources by relative
// path or by the exact origin prefix.

const SEGMENT_EXTENSION: &str = ".ts";
const PLAYLIST_EXTENSION: &str = ".m3u8";

/// One segment or nested-playlist reference found in a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    /// Path exactly as it appears on the playlist line, subdirectory
    /// components included.
    pub relative_path: String,
    /// The reference resolved against the playlist's own directory.
    pub remote_url: String,
}

#[derive(Debug, Clone)]
pub struct RewrittenPlaylist {
    pub content: String,
    /// References in playlist order.
    pub references: Vec<SegmentRef>,
}

/// Rewrite `content` so origin-prefixed references resolve under
/// `local_base_url`, and collect the reference lines to mirror locally.
pub fn rewrite_playlist(
    content: &str,
    playlist_url: &str,
    local_base_url: &str,
    profile_name: &str,
) -> RewrittenPlaylist {
    let origin_base = origin_base(playlist_url);
    let local_prefix = format!("{local_base_url}{profile_name}/");
    let rewritten = content.replace(&format!("{origin_base}/"), &local_prefix);

    let references = content
        .lines()
        .filter(|line| is_reference(line))
        .map(|line| SegmentRef {
            relative_path: line.to_string(),
            remote_url: format!("{origin_base}/{line}"),
        })
        .collect();

    RewrittenPlaylist {
        content: rewritten,
        references,
    }
}

/// The playlist URL with its final path segment removed.
fn origin_base(playlist_url: &str) -> &str {
    playlist_url
        .rsplit_once('/')
        .map_or(playlist_url, |(base, _)| base)
}

/// Standalone reference lines only. Directive lines that embed URIs as
/// attributes (`#EXT-X-KEY` and friends) are not treated as references.
fn is_reference(line: &str) -> bool {
    !line.starts_with('#')
        && (line.ends_with(SEGMENT_EXTENSION) || line.ends_with(PLAYLIST_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_every_origin_base_occurrence() {
        let content = "#EXTM3U\n\
                       #EXT-X-VERSION:3\n\
                       #EXTINF:6.0,\n\
                       https://cdn.example/hls/abc/720p/seg0.ts\n\
                       #EXTINF:6.0,\n\
                       https://cdn.example/hls/abc/720p/seg1.ts\n";
        let rewritten = rewrite_playlist(
            content,
            "https://cdn.example/hls/abc/720p/index.m3u8",
            "http://localhost:8080/cache/",
            "720p",
        );
        assert!(!rewritten.content.contains("https://cdn.example/hls/abc/720p/"));
        assert!(
            rewritten
                .content
                .contains("http://localhost:8080/cache/720p/seg0.ts")
        );
        assert!(
            rewritten
                .content
                .contains("http://localhost:8080/cache/720p/seg1.ts")
        );
    }

    #[test]
    fn collects_reference_lines_in_order() {
        let content = "#EXTM3U\n\
                       seg0.ts\n\
                       sub/seg1.ts\n\
                       rendition.m3u8\n\
                       #comment.ts\n\
                       \n\
                       poster.jpg\n";
        let rewritten = rewrite_playlist(
            content,
            "https://cdn.example/hls/abc/480p/index.m3u8",
            "http://localhost:8080/cache/",
            "480p",
        );
        let paths: Vec<&str> = rewritten
            .references
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["seg0.ts", "sub/seg1.ts", "rendition.m3u8"]);
        assert_eq!(
            rewritten.references[1].remote_url,
            "https://cdn.example/hls/abc/480p/sub/seg1.ts"
        );
    }

    #[test]
    fn relative_lines_stay_relative_in_rewritten_content() {
        let content = "#EXTM3U\nseg0.ts\nseg1.ts\n";
        let rewritten = rewrite_playlist(
            content,
            "https://cdn.example/hls/abc/480p/index.m3u8",
            "http://localhost:8080/cache/",
            "480p",
        );
        assert_eq!(rewritten.content, content);
    }

    #[test]
    fn key_directive_lines_are_left_alone() {
        // Attribute-embedded URIs are outside the rewrite contract: the line
        // survives untouched and the key file is never scheduled for download.
        let content = "#EXTM3U\n\
                       #EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n\
                       seg0.ts\n";
        let rewritten = rewrite_playlist(
            content,
            "https://cdn.example/hls/abc/480p/index.m3u8",
            "http://localhost:8080/cache/",
            "480p",
        );
        assert!(rewritten.content.contains("URI=\"key.bin\""));
        let paths: Vec<&str> = rewritten
            .references
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["seg0.ts"]);
    }
}
