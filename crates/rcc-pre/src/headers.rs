//! Synthetic system headers.
//!
//! Instead of reading the host's headers, the recognized names substitute a
//! fixed block of forward declarations, written in the accepted subset
//! (`int`, `char`, `void`, pointers, `...` variadic tails). Anything a
//! program uses from an unrecognized system header will surface later as an
//! "undefined variable" parse error, which is the intended contract.

/// Declaration block for a recognized system header name, or `None` if the
/// header is unknown (and the include should be dropped).
pub fn system_header(name: &str) -> Option<&'static str> {
    SYSTEM_HEADERS
        .iter()
        .find(|&&(header, _)| header == name)
        .map(|&(_, decls)| decls)
}

const SYSTEM_HEADERS: &[(&str, &str)] = &[
    (
        "stdio.h",
        "typedef void FILE;\n\
         int printf(char *fmt, ...);\n\
         int fprintf(FILE *stream, char *fmt, ...);\n\
         int snprintf(char *buf, int size, char *fmt, ...);\n\
         int sprintf(char *buf, char *fmt, ...);\n\
         int puts(char *s);\n\
         int putchar(int c);\n\
         int getchar(void);\n\
         FILE *fopen(char *path, char *mode);\n\
         int fclose(FILE *stream);\n\
         int fgetc(FILE *stream);\n\
         int fputc(int c, FILE *stream);\n",
    ),
    (
        "stdlib.h",
        "void *malloc(int size);\n\
         void *calloc(int count, int size);\n\
         void *realloc(void *ptr, int size);\n\
         void free(void *ptr);\n\
         void exit(int status);\n\
         int atoi(char *s);\n\
         int abs(int n);\n\
         int system(char *command);\n",
    ),
    (
        "string.h",
        "int strlen(char *s);\n\
         int strcmp(char *a, char *b);\n\
         int strncmp(char *a, char *b, int n);\n\
         char *strcpy(char *dst, char *src);\n\
         char *strncpy(char *dst, char *src, int n);\n\
         char *strcat(char *dst, char *src);\n\
         char *strchr(char *s, int c);\n\
         char *strstr(char *haystack, char *needle);\n\
         void *memcpy(void *dst, void *src, int n);\n\
         void *memset(void *dst, int c, int n);\n",
    ),
    (
        "ctype.h",
        "int isspace(int c);\n\
         int isdigit(int c);\n\
         int isalpha(int c);\n\
         int isalnum(int c);\n\
         int ispunct(int c);\n\
         int toupper(int c);\n\
         int tolower(int c);\n",
    ),
    ("stdarg.h", "typedef void *va_list;\n"),
    ("errno.h", "extern int errno;\n"),
    (
        "unistd.h",
        "int unlink(char *path);\n\
         int access(char *path, int mode);\n",
    ),
    (
        "stdbool.h",
        "typedef int bool;\n\
         enum { false, true };\n",
    ),
    (
        "stddef.h",
        "typedef int size_t;\n\
         typedef int ptrdiff_t;\n\
         enum { NULL };\n",
    ),
    (
        "stdint.h",
        "typedef char int8_t;\n\
         typedef int int32_t;\n\
         typedef int intptr_t;\n",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_headers() {
        assert!(system_header("stdio.h").unwrap().contains("printf"));
        assert!(system_header("string.h").unwrap().contains("memcpy"));
        assert!(system_header("stdbool.h").unwrap().contains("typedef int bool"));
    }

    #[test]
    fn test_unknown_header() {
        assert!(system_header("sys/mman.h").is_none());
        assert!(system_header("math.h").is_none());
    }

    #[test]
    fn test_blocks_contain_no_directives() {
        for &(_, decls) in SYSTEM_HEADERS {
            assert!(!decls.contains('#'));
        }
    }
}
