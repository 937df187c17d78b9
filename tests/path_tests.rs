//! Path canonicalization.

use bootfs::path::absolute_path;

#[test]
fn absolute_inputs_canonicalize() {
    let cases = [
        ("/boot/kernel", "/boot/kernel"),
        ("/boot//kernel", "/boot/kernel"),
        ("//boot///grub//grub.cfg", "/boot/grub/grub.cfg"),
        ("/boot/./kernel", "/boot/kernel"),
        ("/boot/../kernel", "/kernel"),
        ("/a/b/c/../../d", "/a/d"),
        ("/..", "/"),
        ("/../..", "/"),
        ("/boot/", "/boot"),
        ("/", "/"),
        ("/.", "/"),
    ];

    for (input, expected) in cases {
        let got = absolute_path(input, "/", 256).expect(input);
        assert_eq!(got, expected, "input {input:?}");
    }
}

#[test]
fn relative_inputs_resolve_against_pwd() {
    assert_eq!(
        absolute_path("grub.cfg", "/boot", 256).as_deref(),
        Some("/boot/grub.cfg")
    );
    assert_eq!(
        absolute_path("../kernel", "/boot/grub", 256).as_deref(),
        Some("/boot/kernel")
    );
    assert_eq!(
        absolute_path("a/b", "/x/", 256).as_deref(),
        Some("/x/a/b")
    );
    assert_eq!(absolute_path("..", "/x/", 256).as_deref(), Some("/"));
}

#[test]
fn empty_path_yields_pwd_verbatim() {
    assert_eq!(
        absolute_path("", "/boot/grub", 256).as_deref(),
        Some("/boot/grub")
    );
}

#[test]
fn canonicalization_is_idempotent() {
    let samples = [
        "/a//b/./c/../d",
        "weird/../../path",
        "/boot/grub/",
        "",
        "/.././x",
        "deep/a/b/c/d/e",
    ];

    for sample in samples {
        let once = absolute_path(sample, "/pwd", 256).expect(sample);
        let twice = absolute_path(&once, "/pwd", 256).expect(&once);
        assert_eq!(once, twice, "sample {sample:?}");
    }
}

#[test]
fn overflow_returns_none() {
    assert_eq!(absolute_path("/boot/kernel", "/", 8), None);
    assert_eq!(absolute_path("x", "/long-working-directory", 8), None);
    assert_eq!(absolute_path("", "/toolong", 8), None);

    // A component that overflows mid-way fails even if `..` would have
    // shrunk the result later.
    assert_eq!(absolute_path("/abcdefghij/..", "/", 8), None);

    // Exactly fitting is fine: len < size.
    assert_eq!(absolute_path("/boot", "/", 6).as_deref(), Some("/boot"));
    assert_eq!(absolute_path("/boot", "/", 5), None);
}
